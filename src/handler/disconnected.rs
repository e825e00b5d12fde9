//! The disconnected lifecycle step.

use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use tracing::debug;

use super::{ConnectedHandler, Handler, HandlerConnect};
use crate::{
    connector::{ConnectionParameters, Connector, Login},
    error::ClientError,
    transport::ReadOutcome,
};

/// The handler installed while no connection exists.
///
/// All I/O operations fail with [`ClientError::NotConnected`].
/// `do_connect` opens a fresh transport, performs the login exchange, and
/// on success hands ownership of the transport to a new
/// [`ConnectedHandler`].
pub struct DisconnectedHandler<C> {
    connector: Arc<C>,
}

impl<C> DisconnectedHandler<C> {
    /// Create the disconnected handler for `connector`.
    #[must_use]
    pub fn new(connector: Arc<C>) -> Self { Self { connector } }
}

#[async_trait]
impl<C: Connector> Handler<C::Message, C::Params> for DisconnectedHandler<C> {
    async fn do_connect(&self, params: &C::Params) -> HandlerConnect<C::Message, C::Params> {
        let transport = match self.connector.open(params).await {
            Ok(transport) => transport,
            Err(error) => {
                return HandlerConnect::Error {
                    error: error.into(),
                };
            }
        };

        let login = self.connector.login_message(params);
        match transport
            .send_and_wait(login, params.connect_timeout())
            .await
        {
            Ok(response) => match self.connector.classify(&response) {
                Login::Accepted => HandlerConnect::Succeeded {
                    response,
                    handler: Arc::new(ConnectedHandler::new(transport)),
                },
                Login::Rejected => {
                    // The transport does not survive a rejected handshake.
                    transport.close().await;
                    HandlerConnect::Failed { message: response }
                }
            },
            Err(error) => {
                debug!(error = %error, "login exchange failed");
                transport.close().await;
                HandlerConnect::Error {
                    error: error.into(),
                }
            }
        }
    }

    async fn receive(
        &self,
        _timeout: Duration,
    ) -> Result<ReadOutcome<C::Message>, ClientError> {
        Err(ClientError::NotConnected)
    }

    async fn send(&self, _message: C::Message) -> Result<(), ClientError> {
        Err(ClientError::NotConnected)
    }

    async fn send_and_forget(&self, _message: C::Message) -> Result<(), ClientError> {
        Err(ClientError::NotConnected)
    }

    async fn send_and_wait(
        &self,
        _message: C::Message,
        _timeout: Duration,
    ) -> Result<C::Message, ClientError> {
        Err(ClientError::NotConnected)
    }

    fn is_closed(&self) -> bool { true }

    async fn close(&self) {}
}
