//! Client lifecycle states.

use std::sync::Arc;

use crate::error::ClientError;

/// Why a `connect` attempt failed.
///
/// Exactly one of the two fields is populated: a server rejection carries
/// the server's message, everything else carries the error.
#[derive(Clone, Debug)]
pub struct ConnectFailure<M> {
    error: Option<Arc<ClientError>>,
    response: Option<M>,
}

impl<M> ConnectFailure<M> {
    /// The server answered the handshake with `response`, rejecting it.
    #[must_use]
    pub const fn rejected(response: M) -> Self {
        Self {
            error: None,
            response: Some(response),
        }
    }

    /// The handshake failed with `error` before any server verdict.
    #[must_use]
    pub const fn errored(error: Arc<ClientError>) -> Self {
        Self {
            error: Some(error),
            response: None,
        }
    }

    /// The failure cause, when the handshake errored.
    #[must_use]
    pub fn error(&self) -> Option<&Arc<ClientError>> { self.error.as_ref() }

    /// The server's rejection message, when the handshake was refused.
    #[must_use]
    pub const fn response(&self) -> Option<&M> { self.response.as_ref() }
}

/// The observable lifecycle state of a client.
///
/// `M` is the protocol's message type, `P` its connection parameters.
#[derive(Clone, Debug)]
pub enum ClientState<M, P> {
    /// No connection exists and none is being attempted.
    Disconnected,
    /// A connection attempt with the given parameters is in progress.
    Connecting(P),
    /// The server accepted the login with this response; `Connected`
    /// follows immediately.
    ConnectionSucceeded(M),
    /// A connection is live; ordinary I/O operations succeed.
    Connected,
    /// The most recent connection attempt failed.
    ConnectionFailed(ConnectFailure<M>),
    /// Terminal teardown has begun.
    Closing,
    /// The client is closed; no further states are published and no
    /// further operations succeed.
    Closed,
}

impl<M, P> ClientState<M, P> {
    /// Return `true` if this state implies the client is either closing
    /// or has closed.
    #[must_use]
    pub const fn is_closing_or_closed(&self) -> bool {
        matches!(self, Self::Closing | Self::Closed)
    }

    /// A short static name for logging and test assertions.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting(_) => "connecting",
            Self::ConnectionSucceeded(_) => "connection_succeeded",
            Self::Connected => "connected",
            Self::ConnectionFailed(_) => "connection_failed",
            Self::Closing => "closing",
            Self::Closed => "closed",
        }
    }
}
