//! The connected lifecycle step.

use std::{marker::PhantomData, sync::Arc, time::Duration};

use async_trait::async_trait;

use super::{Handler, HandlerConnect};
use crate::{
    connector::ConnectionParameters,
    error::ClientError,
    message::Message,
    transport::{ReadOutcome, Transport},
};

/// The handler installed while a connection is live.
///
/// Owns its transport exclusively; closing the handler closes the
/// transport. I/O operations delegate straight through. A further
/// `do_connect` is refused — the client's reconnection policy disconnects
/// first.
pub struct ConnectedHandler<M, P> {
    transport: Arc<dyn Transport<M>>,
    _params: PhantomData<fn() -> P>,
}

impl<M: Message, P: ConnectionParameters> ConnectedHandler<M, P> {
    /// Take ownership of `transport`.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport<M>>) -> Self {
        Self {
            transport,
            _params: PhantomData,
        }
    }
}

#[async_trait]
impl<M: Message, P: ConnectionParameters> Handler<M, P> for ConnectedHandler<M, P> {
    async fn do_connect(&self, _params: &P) -> HandlerConnect<M, P> {
        HandlerConnect::Error {
            error: ClientError::AlreadyConnected,
        }
    }

    async fn receive(&self, timeout: Duration) -> Result<ReadOutcome<M>, ClientError> {
        Ok(self.transport.receive(timeout).await?)
    }

    async fn send(&self, message: M) -> Result<(), ClientError> {
        Ok(self.transport.send(message).await?)
    }

    async fn send_and_forget(&self, message: M) -> Result<(), ClientError> {
        Ok(self.transport.send_and_forget(message).await?)
    }

    async fn send_and_wait(&self, message: M, timeout: Duration) -> Result<M, ClientError> {
        Ok(self.transport.send_and_wait(message, timeout).await?)
    }

    fn is_closed(&self) -> bool { self.transport.is_closed() }

    async fn close(&self) { self.transport.close().await; }
}
