//! Connection handlers.
//!
//! A handler owns the current lifecycle step. Exactly one handler is
//! current at any time: the [`DisconnectedHandler`] fails all I/O and
//! knows how to attempt a login, the [`ConnectedHandler`] delegates I/O to
//! the transport it owns. A successful `do_connect` returns a *new*
//! handler value; the client swaps its field, so there is no shared
//! mutable handler state.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    connector::ConnectionParameters,
    error::ClientError,
    message::Message,
    transport::ReadOutcome,
};

mod connected;
mod disconnected;

pub use connected::ConnectedHandler;
pub use disconnected::DisconnectedHandler;

/// The result of asking a handler to establish a connection.
pub enum HandlerConnect<M: Message, P: ConnectionParameters> {
    /// The server accepted the login. `handler` owns the new transport
    /// and replaces the current handler.
    Succeeded {
        /// The server's login response.
        response: M,
        /// The connected handler that takes over.
        handler: Arc<dyn Handler<M, P>>,
    },
    /// The server answered the handshake with a rejection; the transport
    /// has been closed.
    Failed {
        /// The server's rejection message.
        message: M,
    },
    /// The handshake failed without a server verdict (timeout, transport
    /// death, or a connect attempt on an already-connected handler).
    Error {
        /// The failure cause.
        error: ClientError,
    },
}

/// A lifecycle step that owns (or lacks) a transport.
#[async_trait]
pub trait Handler<M: Message, P: ConnectionParameters>: Send + Sync {
    /// Attempt to establish a new connection using `params`.
    async fn do_connect(&self, params: &P) -> HandlerConnect<M, P>;

    /// See [`Transport::receive`](crate::transport::Transport::receive).
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::NotConnected`] on a disconnected handler,
    /// otherwise as the owned transport fails.
    async fn receive(&self, timeout: Duration) -> Result<ReadOutcome<M>, ClientError>;

    /// See [`Transport::send`](crate::transport::Transport::send).
    ///
    /// # Errors
    ///
    /// As for [`Handler::receive`].
    async fn send(&self, message: M) -> Result<(), ClientError>;

    /// See [`Transport::send_and_forget`](crate::transport::Transport::send_and_forget).
    ///
    /// # Errors
    ///
    /// As for [`Handler::receive`].
    async fn send_and_forget(&self, message: M) -> Result<(), ClientError>;

    /// See [`Transport::send_and_wait`](crate::transport::Transport::send_and_wait).
    ///
    /// # Errors
    ///
    /// As for [`Handler::receive`], plus [`TransportError::Timeout`] and
    /// [`TransportError::ReceiveQueueOverflow`].
    ///
    /// [`TransportError::Timeout`]: crate::error::TransportError::Timeout
    /// [`TransportError::ReceiveQueueOverflow`]: crate::error::TransportError::ReceiveQueueOverflow
    async fn send_and_wait(&self, message: M, timeout: Duration) -> Result<M, ClientError>;

    /// Return `true` once this handler holds no live transport.
    fn is_closed(&self) -> bool;

    /// Close the owned transport, if any. Idempotent.
    async fn close(&self);
}
