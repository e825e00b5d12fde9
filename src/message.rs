//! Message identity and correlation.
//!
//! The runtime never inspects message payloads. It relies on two things
//! only: every message has a unique [`MessageId`], and responses can be
//! matched to the request that produced them via
//! [`Message::is_response_for`].

use std::fmt;

use bincode::{
    BorrowDecode,
    Encode,
    config,
    error::{DecodeError, EncodeError},
};
use uuid::Uuid;

/// A 128-bit opaque message identifier, unique within the life of a client.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, bincode::Encode, bincode::Decode)]
pub struct MessageId(u128);

impl MessageId {
    /// Generate a fresh random identifier.
    #[must_use]
    pub fn random() -> Self { Self(Uuid::new_v4().as_u128()) }

    /// Construct an identifier from a raw 128-bit value.
    ///
    /// Useful for deterministic identifiers in tests; production callers
    /// should prefer [`MessageId::random`].
    #[must_use]
    pub const fn from_u128(value: u128) -> Self { Self(value) }

    /// Return the raw 128-bit value.
    #[must_use]
    pub const fn as_u128(self) -> u128 { self.0 }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Uuid::from_u128(self.0), f)
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", Uuid::from_u128(self.0))
    }
}

/// A message carried by the runtime.
///
/// Two distinct in-flight requests must never share a message id within a
/// single transport. The default [`is_response_for`](Message::is_response_for)
/// implements the conventional rule: a message answers `other` when its
/// correlation id equals `other`'s message id. Protocols with richer
/// matching rules override the predicate.
pub trait Message: Send + Sync + 'static {
    /// The unique identifier of this message.
    fn message_id(&self) -> MessageId;

    /// For responses, the id of the request this message answers.
    fn correlation_id(&self) -> Option<MessageId> { None }

    /// Return `true` iff this message is a response correlated to `other`.
    fn is_response_for(&self, other: &Self) -> bool {
        self.correlation_id() == Some(other.message_id())
    }
}

/// A message that can cross a byte-framed transport.
///
/// Any [`Message`] deriving [`Encode`] and [`BorrowDecode`] implements this
/// trait via the blanket implementation; the provided methods encode with
/// bincode's standard configuration. The core lifecycle machinery does not
/// require it — only byte-level transports such as
/// [`TcpTransport`](crate::transport::TcpTransport) do.
pub trait WireMessage: Message + Encode + for<'de> BorrowDecode<'de, ()> + fmt::Debug {
    /// Serialize the message into a byte vector.
    ///
    /// # Errors
    ///
    /// Returns an [`EncodeError`] if serialization fails.
    fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        bincode::encode_to_vec(self, config::standard())
    }

    /// Deserialize a message from a byte slice.
    ///
    /// # Errors
    ///
    /// Returns a [`DecodeError`] if the bytes do not describe a valid
    /// message.
    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError>
    where
        Self: Sized,
    {
        let (message, _consumed) = bincode::borrow_decode_from_slice(bytes, config::standard())?;
        Ok(message)
    }
}

impl<T> WireMessage for T where T: Message + Encode + for<'de> BorrowDecode<'de, ()> + fmt::Debug {}
