//! End-to-end demo: a tiny chat protocol over the framed TCP transport.
//!
//! Starts an in-process server, connects a [`hawser::Client`] to it,
//! asks a few questions, and prints every lifecycle state as it is
//! published. Run with `cargo run --example tcp_chat`.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use hawser::{
    Client,
    ConnectionParameters,
    Connector,
    Login,
    Message,
    MessageId,
    ReadOutcome,
    TcpTransport,
    TcpTransportConfig,
    Transport,
    TransportError,
    WireMessage,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::{Framed, LengthDelimitedCodec};

#[derive(Debug, Clone, bincode::Encode, bincode::Decode)]
enum ChatMessage {
    Join {
        id: MessageId,
        nick: String,
        password: String,
    },
    Welcome {
        id: MessageId,
        correlation: MessageId,
    },
    Rejected {
        id: MessageId,
        correlation: MessageId,
    },
    Say {
        id: MessageId,
        text: String,
    },
    Said {
        id: MessageId,
        correlation: MessageId,
    },
    Broadcast {
        id: MessageId,
        text: String,
    },
}

impl Message for ChatMessage {
    fn message_id(&self) -> MessageId {
        match self {
            Self::Join { id, .. }
            | Self::Welcome { id, .. }
            | Self::Rejected { id, .. }
            | Self::Say { id, .. }
            | Self::Said { id, .. }
            | Self::Broadcast { id, .. } => *id,
        }
    }

    fn correlation_id(&self) -> Option<MessageId> {
        match self {
            Self::Welcome { correlation, .. }
            | Self::Rejected { correlation, .. }
            | Self::Said { correlation, .. } => Some(*correlation),
            Self::Join { .. } | Self::Say { .. } | Self::Broadcast { .. } => None,
        }
    }
}

#[derive(Clone, Debug)]
struct ChatParams {
    addr: SocketAddr,
    nick: String,
    password: String,
}

impl ConnectionParameters for ChatParams {
    fn connect_timeout(&self) -> Duration { Duration::from_secs(1) }
}

struct ChatConnector;

#[async_trait]
impl Connector for ChatConnector {
    type Message = ChatMessage;
    type Params = ChatParams;

    async fn open(
        &self,
        params: &ChatParams,
    ) -> Result<Arc<dyn Transport<ChatMessage>>, TransportError> {
        let transport = TcpTransport::connect(params.addr, TcpTransportConfig::default()).await?;
        Ok(Arc::new(transport))
    }

    fn login_message(&self, params: &ChatParams) -> ChatMessage {
        ChatMessage::Join {
            id: MessageId::random(),
            nick: params.nick.clone(),
            password: params.password.clone(),
        }
    }

    fn classify(&self, response: &ChatMessage) -> Login {
        match response {
            ChatMessage::Welcome { .. } => Login::Accepted,
            _ => Login::Rejected,
        }
    }
}

/// Serve one chat connection: accept any password except an empty one,
/// echo every `Say`, and broadcast what was said back to the room.
async fn serve(stream: TcpStream) {
    let mut framed = Framed::new(stream, LengthDelimitedCodec::new());

    while let Some(Ok(bytes)) = framed.next().await {
        let Ok(message) = ChatMessage::from_bytes(&bytes) else {
            return;
        };
        let replies = match &message {
            ChatMessage::Join { id, password, .. } if !password.is_empty() => {
                vec![ChatMessage::Welcome {
                    id: MessageId::random(),
                    correlation: *id,
                }]
            }
            ChatMessage::Join { id, .. } => vec![ChatMessage::Rejected {
                id: MessageId::random(),
                correlation: *id,
            }],
            ChatMessage::Say { id, text } => vec![
                ChatMessage::Said {
                    id: MessageId::random(),
                    correlation: *id,
                },
                ChatMessage::Broadcast {
                    id: MessageId::random(),
                    text: format!("room echo: {text}"),
                },
            ],
            _ => Vec::new(),
        };

        for reply in replies {
            let encoded = reply.to_bytes().expect("encode reply");
            if framed.send(Bytes::from(encoded)).await.is_err() {
                return;
            }
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hawser=trace".into()),
        )
        .init();

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local address");
    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(serve(stream));
        }
    });

    let client = Client::new(ChatConnector);

    let mut states = client.state();
    let watcher = tokio::spawn(async move {
        while let Some(state) = states.recv().await {
            println!("state: {}", state.name());
        }
    });

    let params = ChatParams {
        addr,
        nick: "ferris".into(),
        password: "sesame".into(),
    };
    let result = client.connect(params).await;
    println!("connected: {}", result.is_succeeded());

    for text in ["ahoy", "anyone home?", "goodbye"] {
        let say = ChatMessage::Say {
            id: MessageId::random(),
            text: text.into(),
        };
        match client.send_and_wait(say, Duration::from_secs(1)).await {
            Ok(reply) => println!("acknowledged: {reply:?}"),
            Err(error) => println!("say failed: {error}"),
        }

        match client.receive(Duration::from_secs(1)).await {
            Ok(ReadOutcome::Received(broadcast)) => println!("push: {broadcast:?}"),
            Ok(other) => println!("unexpected outcome: {other:?}"),
            Err(error) => println!("receive failed: {error}"),
        }
    }

    client.close().await;
    watcher.await.expect("state watcher");
}
