//! In-memory TCP test server speaking the demo protocol.
//!
//! Accepts any number of connections. Each connection must log in first;
//! the password `"password"` is accepted, anything else refused. After
//! login every `Hello` is answered with a correlated `HelloOk`, and a
//! `Hello` whose text is `"chat"` additionally pushes five uncorrelated
//! events after the response.

use std::net::SocketAddr;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use hawser::{Message, WireMessage};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use super::proto::DemoMessage;

pub const GOOD_PASSWORD: &str = "password";
pub const CHAT_EVENT_COUNT: usize = 5;

/// A running demo server; the listener is dropped when this is.
pub struct DemoServer {
    addr: SocketAddr,
    accept_task: JoinHandle<()>,
}

impl DemoServer {
    /// Bind an ephemeral local port and start accepting connections.
    pub async fn spawn() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind demo server");
        let addr = listener.local_addr().expect("demo server address");

        let accept_task = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(serve_connection(stream));
            }
        });

        Self { addr, accept_task }
    }

    /// The address clients should connect to.
    pub fn addr(&self) -> SocketAddr { self.addr }
}

impl Drop for DemoServer {
    fn drop(&mut self) { self.accept_task.abort(); }
}

async fn serve_connection(stream: TcpStream) {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    // Login phase.
    let Some(Ok(bytes)) = framed.next().await else {
        return;
    };
    let Ok(message) = DemoMessage::from_bytes(&bytes) else {
        return;
    };
    let DemoMessage::Login { password, .. } = &message else {
        // Anything that is not a login gets the connection dropped.
        return;
    };

    let verdict = if password == GOOD_PASSWORD {
        DemoMessage::login_ok(message.message_id())
    } else {
        DemoMessage::login_refused(message.message_id(), "bad credentials")
    };
    let refused = matches!(verdict, DemoMessage::LoginRefused { .. });
    if write_message(&mut framed, &verdict).await.is_err() || refused {
        return;
    }

    // Session phase.
    while let Some(Ok(bytes)) = framed.next().await {
        let Ok(request) = DemoMessage::from_bytes(&bytes) else {
            return;
        };
        let DemoMessage::Hello { id, text } = &request else {
            continue;
        };
        if text == "hangup" {
            // Drop the connection without answering.
            return;
        }

        if write_message(&mut framed, &DemoMessage::hello_ok(*id))
            .await
            .is_err()
        {
            return;
        }
        if text == "chat" {
            for n in 0..CHAT_EVENT_COUNT {
                let event = DemoMessage::event(&format!("chat event {n}"));
                if write_message(&mut framed, &event).await.is_err() {
                    return;
                }
            }
        }
    }
}

async fn write_message(
    framed: &mut Framed<TcpStream, LengthDelimitedCodec>,
    message: &DemoMessage,
) -> Result<(), std::io::Error> {
    let bytes = message.to_bytes().expect("encode demo message");
    framed.send(Bytes::from(bytes)).await
}
