//! Pluggable byte-level transports.
//!
//! A [`Transport`] provides the four I/O primitives the runtime builds on:
//! `receive`, `send`, `send_and_forget`, and `send_and_wait`. Two reference
//! implementations ship with the crate: a framed TCP transport backed by a
//! dedicated reader task, and an in-process loopback transport for tests
//! and embedded servers.

use std::time::Duration;

use async_trait::async_trait;

use crate::{error::TransportError, message::Message};

mod loopback;
mod outstanding;
mod queue;
mod tcp;

pub use loopback::{LoopbackPeer, LoopbackTransport};
pub use outstanding::OutstandingRequests;
pub use queue::ReceiveQueue;
pub use tcp::{TcpTransport, TcpTransportConfig};

/// The outcome of a single [`Transport::receive`] call.
#[derive(Debug)]
pub enum ReadOutcome<M> {
    /// The timeout elapsed with no data.
    Nothing,
    /// An uncorrelated message arrived.
    Received(M),
    /// A message arrived that the transport correlated to a
    /// previously-sent request.
    Response {
        /// The original request, as recorded at `send` time.
        request: M,
        /// The correlated response.
        response: M,
    },
}

impl<M> ReadOutcome<M> {
    /// Return the delivered message, if any, discarding the correlation.
    pub fn into_message(self) -> Option<M> {
        match self {
            Self::Nothing => None,
            Self::Received(message) | Self::Response { response: message, .. } => Some(message),
        }
    }
}

/// The byte-level I/O backend the runtime is polymorphic over.
///
/// Methods take `&self`: implementations use interior mutability so that
/// `receive` may run concurrently with `send` and `send_and_forget`. A
/// closed transport is permanent — every operation on it fails with
/// [`TransportError::Closed`].
#[async_trait]
pub trait Transport<M: Message>: Send + Sync {
    /// Block up to `timeout` for the next inbound message.
    ///
    /// Returns [`ReadOutcome::Nothing`] on timeout,
    /// [`ReadOutcome::Received`] for uncorrelated arrivals, and
    /// [`ReadOutcome::Response`] when the implementation knows the
    /// pairing. Reporting every message as `Received` is a valid minimal
    /// implementation.
    ///
    /// # Errors
    ///
    /// Fails with [`TransportError::Closed`] if the transport is already
    /// closed.
    async fn receive(&self, timeout: Duration) -> Result<ReadOutcome<M>, TransportError>;

    /// Dispatch `message` and remember the pairing so that a later
    /// [`ReadOutcome::Response`] may be produced. Does not block on a
    /// response.
    ///
    /// # Errors
    ///
    /// Fails with a transport-specific error; unrecoverable write errors
    /// close the transport.
    async fn send(&self, message: M) -> Result<(), TransportError>;

    /// Dispatch `message` without remembering the pairing; any response
    /// that arrives is delivered as [`ReadOutcome::Received`].
    ///
    /// # Errors
    ///
    /// As for [`Transport::send`].
    async fn send_and_forget(&self, message: M) -> Result<(), TransportError>;

    /// Dispatch `message`, then block until a correlated response arrives
    /// or `timeout` elapses. Out-of-order messages arriving during the
    /// wait are preserved and re-queued for later `receive`.
    ///
    /// # Errors
    ///
    /// Fails with [`TransportError::Timeout`], [`TransportError::Closed`],
    /// [`TransportError::ReceiveQueueOverflow`], or a transport-specific
    /// error.
    async fn send_and_wait(&self, message: M, timeout: Duration) -> Result<M, TransportError>;

    /// Return `true` once the transport has been closed.
    fn is_closed(&self) -> bool;

    /// Tear the transport down. Idempotent; failures on inner resources
    /// are recorded and swallowed.
    async fn close(&self);
}
