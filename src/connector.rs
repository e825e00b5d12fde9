//! The per-protocol plug-in seam.
//!
//! A [`Connector`] teaches the generic lifecycle machinery everything that
//! is specific to one protocol: how to open a transport from connection
//! parameters, what the login message looks like, and how to tell a
//! successful login response from a rejection. The framing and correlation
//! strategy live in the transport the connector opens.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;

use crate::{
    error::TransportError,
    message::Message,
    transport::Transport,
};

/// Parameters used to establish a connection. Opaque to the runtime,
/// which only needs the handshake deadline.
pub trait ConnectionParameters: Clone + Send + Sync + 'static {
    /// The deadline applied to the login exchange.
    fn connect_timeout(&self) -> Duration;
}

/// How a connector classified a handshake response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Login {
    /// The server accepted the login; the connection is usable.
    Accepted,
    /// The server rejected the login, or the reply was not a recognisable
    /// login response.
    Rejected,
}

/// Protocol-specific connection logic.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// The protocol's message type.
    type Message: Message + Clone;

    /// The protocol's connection parameters.
    type Params: ConnectionParameters;

    /// Open a fresh transport configured from `params`.
    ///
    /// # Errors
    ///
    /// Fails with a transport-specific error when the underlying channel
    /// cannot be established.
    async fn open(
        &self,
        params: &Self::Params,
    ) -> Result<Arc<dyn Transport<Self::Message>>, TransportError>;

    /// Build the login message sent as the first request on a fresh
    /// transport.
    fn login_message(&self, params: &Self::Params) -> Self::Message;

    /// Classify the handshake response.
    fn classify(&self, response: &Self::Message) -> Login;
}
