//! Demo message protocol shared by the integration tests.
//!
//! A deliberately small protocol: a login command with a user/password
//! pair, a hello command, their correlated responses, and an uncorrelated
//! server-push event.

use hawser::{Message, MessageId};

/// The messages of the demo protocol.
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub enum DemoMessage {
    /// Client login command.
    Login {
        id: MessageId,
        user: String,
        password: String,
    },
    /// Server accepted the login.
    LoginOk { id: MessageId, correlation: MessageId },
    /// Server rejected the login.
    LoginRefused {
        id: MessageId,
        correlation: MessageId,
        reason: String,
    },
    /// Client request.
    Hello { id: MessageId, text: String },
    /// Correlated response to a [`DemoMessage::Hello`].
    HelloOk { id: MessageId, correlation: MessageId },
    /// Uncorrelated server push.
    Event { id: MessageId, text: String },
}

impl DemoMessage {
    pub fn login(user: &str, password: &str) -> Self {
        Self::Login {
            id: MessageId::random(),
            user: user.to_owned(),
            password: password.to_owned(),
        }
    }

    pub fn login_ok(correlation: MessageId) -> Self {
        Self::LoginOk {
            id: MessageId::random(),
            correlation,
        }
    }

    pub fn login_refused(correlation: MessageId, reason: &str) -> Self {
        Self::LoginRefused {
            id: MessageId::random(),
            correlation,
            reason: reason.to_owned(),
        }
    }

    pub fn hello(text: &str) -> Self {
        Self::Hello {
            id: MessageId::random(),
            text: text.to_owned(),
        }
    }

    pub fn hello_ok(correlation: MessageId) -> Self {
        Self::HelloOk {
            id: MessageId::random(),
            correlation,
        }
    }

    pub fn event(text: &str) -> Self {
        Self::Event {
            id: MessageId::random(),
            text: text.to_owned(),
        }
    }

    pub fn is_event(&self) -> bool { matches!(self, Self::Event { .. }) }
}

impl Message for DemoMessage {
    fn message_id(&self) -> MessageId {
        match self {
            Self::Login { id, .. }
            | Self::LoginOk { id, .. }
            | Self::LoginRefused { id, .. }
            | Self::Hello { id, .. }
            | Self::HelloOk { id, .. }
            | Self::Event { id, .. } => *id,
        }
    }

    fn correlation_id(&self) -> Option<MessageId> {
        match self {
            Self::LoginOk { correlation, .. }
            | Self::LoginRefused { correlation, .. }
            | Self::HelloOk { correlation, .. } => Some(*correlation),
            Self::Login { .. } | Self::Hello { .. } | Self::Event { .. } => None,
        }
    }
}
