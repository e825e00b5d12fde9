//! Error taxonomies for transports and clients.
//!
//! Two layers, two enums. [`TransportError`] covers everything that can go
//! wrong on the wire: closed transports, timeouts, codec failures, and the
//! bounded correlation queue rejecting a message. [`ClientError`] adds the
//! lifecycle failures the client facade introduces on top, and passes
//! transport failures through unchanged.

use std::{io, time::Duration};

/// Failures raised by a [`Transport`](crate::transport::Transport).
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The transport has been closed; all further operations fail.
    #[error("transport is closed")]
    Closed,

    /// `send_and_wait` exceeded the supplied deadline. The pending
    /// correlation entry has been removed; the transport remains usable.
    #[error("no response received within {0:?}")]
    Timeout(Duration),

    /// The bounded correlation queue rejected a message. Fatal for the
    /// current `send_and_wait`; the transport remains usable and the
    /// caller should drain buffered messages via `receive`.
    #[error("receive queue overflowed (capacity {0})")]
    ReceiveQueueOverflow(usize),

    /// An I/O failure on the underlying byte channel.
    #[error("transport i/o failed")]
    Io(#[from] io::Error),

    /// Failed to encode an outbound message.
    #[error("failed to encode message")]
    Encode(#[source] bincode::error::EncodeError),

    /// Failed to decode an inbound message.
    #[error("failed to decode message")]
    Decode(#[source] bincode::error::DecodeError),

    /// A payload decoded but was semantically malformed.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl TransportError {
    /// Return `true` if this error is a `send_and_wait` deadline failure.
    #[must_use]
    pub const fn is_timeout(&self) -> bool { matches!(self, Self::Timeout(_)) }
}

/// Failures raised by a [`Client`](crate::client::Client) operation.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The operation was invoked after the client entered `Closing` or
    /// `Closed`. Always fatal at the call site.
    #[error("client is closed")]
    Closed,

    /// The operation requires a connected handler but the client is not
    /// connected. The caller may retry after `connect`.
    #[error("client is not connected")]
    NotConnected,

    /// `connect` was delegated to a handler that already holds a live
    /// connection.
    #[error("client is already connected")]
    AlreadyConnected,

    /// A transport-level failure, surfaced unchanged.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl ClientError {
    /// Return `true` if this error is a `send_and_wait` deadline failure.
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(TransportError::Timeout(_)))
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(io::ErrorKind::BrokenPipe)]
    #[case(io::ErrorKind::UnexpectedEof)]
    fn io_errors_map_to_transport_io_variant(#[case] kind: io::ErrorKind) {
        let err = TransportError::from(io::Error::new(kind, "wire failure"));
        assert!(matches!(err, TransportError::Io(_)));
    }

    #[test]
    fn transport_errors_pass_through_client_errors() {
        let err = ClientError::from(TransportError::Timeout(Duration::from_secs(1)));
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            TransportError::Timeout(Duration::from_secs(1)).to_string()
        );
    }

    #[test]
    fn overflow_reports_capacity() {
        let err = TransportError::ReceiveQueueOverflow(10);
        assert!(err.to_string().contains("10"));
    }
}
