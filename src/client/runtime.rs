//! The client facade and its lifecycle state machine.

use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use tracing::{debug, trace};

use super::{
    publisher::{StatePublisher, StateStream},
    state::{ClientState, ConnectFailure},
};
use crate::{
    connector::Connector,
    error::ClientError,
    handler::{DisconnectedHandler, Handler, HandlerConnect},
    transport::ReadOutcome,
};

/// Settings for a [`Client`].
#[derive(Clone, Copy, Debug)]
pub struct ClientConfig {
    state_buffer: usize,
}

impl ClientConfig {
    /// Number of state values buffered per subscriber before
    /// notifications are dropped for that subscriber.
    #[must_use]
    pub const fn state_buffer(mut self, state_buffer: usize) -> Self {
        self.state_buffer = state_buffer;
        self
    }

    /// Inspect the configured per-subscriber buffer size.
    #[must_use]
    pub const fn state_buffer_value(&self) -> usize { self.state_buffer }
}

impl Default for ClientConfig {
    fn default() -> Self { Self { state_buffer: 256 } }
}

/// The outcome of [`Client::connect`].
#[derive(Debug)]
pub enum ConnectResult<M> {
    /// The server accepted the login; the client is now connected.
    Succeeded(M),
    /// The server rejected the login; the client remains disconnected.
    Failed(M),
    /// The attempt failed without a server verdict (closed client,
    /// unreachable endpoint, handshake timeout, transport death).
    Error(Arc<ClientError>),
}

impl<M> ConnectResult<M> {
    /// Return `true` when the connection was established.
    #[must_use]
    pub const fn is_succeeded(&self) -> bool { matches!(self, Self::Succeeded(_)) }
}

type DynHandler<C> =
    Arc<dyn Handler<<C as Connector>::Message, <C as Connector>::Params>>;

/// The state field and the current handler, guarded together: a handler
/// is only ever replaced in the same critical section that moves the
/// state machine.
struct Shared<C: Connector> {
    state: ClientState<C::Message, C::Params>,
    handler: DynHandler<C>,
}

/// A transport-agnostic RPC client.
///
/// Owns the current [`Handler`] and publishes every lifecycle transition
/// on a hot state stream. All operations take `&self` and are safe to
/// call from multiple tasks: lifecycle operations (`connect`,
/// `disconnect`, `close`) serialise on an internal mutex for their whole
/// duration, so a teardown can never interleave with a connection
/// attempt's handler swap.
///
/// # Examples
///
/// ```ignore
/// let client = Client::new(MyConnector::new(config));
///
/// if let ConnectResult::Succeeded(login) = client.connect(params).await {
///     let reply = client.send_and_wait(request, Duration::from_secs(1)).await?;
/// }
/// client.close().await;
/// ```
pub struct Client<C: Connector> {
    shared: Mutex<Shared<C>>,
    /// Serialises `connect`/`disconnect`/`close` across their await
    /// points. Always acquired before `shared`, which in turn is only
    /// ever held for a field access, never across an await.
    lifecycle: tokio::sync::Mutex<()>,
    disconnected: DynHandler<C>,
    publisher: StatePublisher<C::Message, C::Params>,
}

impl<C: Connector> Client<C> {
    /// Create a client for `connector` with default settings.
    #[must_use]
    pub fn new(connector: C) -> Self { Self::with_config(connector, ClientConfig::default()) }

    /// Create a client for `connector` with explicit settings.
    #[must_use]
    pub fn with_config(connector: C, config: ClientConfig) -> Self {
        let disconnected: DynHandler<C> =
            Arc::new(DisconnectedHandler::new(Arc::new(connector)));
        Self {
            shared: Mutex::new(Shared {
                state: ClientState::Disconnected,
                handler: Arc::clone(&disconnected),
            }),
            lifecycle: tokio::sync::Mutex::new(()),
            disconnected,
            publisher: StatePublisher::new(config.state_buffer_value()),
        }
    }

    /// A synchronous snapshot of the current lifecycle state.
    #[must_use]
    pub fn state_now(&self) -> ClientState<C::Message, C::Params> {
        self.lock_shared().state.clone()
    }

    /// Subscribe to the hot stream of lifecycle transitions.
    ///
    /// Delivery is best-effort per subscriber: a slow subscriber loses
    /// notifications rather than delaying the client. The stream
    /// terminates after the final `Closed` value.
    #[must_use]
    pub fn state(&self) -> StateStream<C::Message, C::Params> { self.publisher.subscribe() }

    /// Return `true` once the client has closed.
    #[must_use]
    pub fn is_closed(&self) -> bool { matches!(self.lock_shared().state, ClientState::Closed) }

    /// Establish a connection using `params`.
    ///
    /// Any existing connection is first torn down (best-effort), so
    /// calling `connect` twice in a row is equivalent to `disconnect`
    /// followed by `connect`. The published state sequence for one
    /// invocation is `Connecting` followed by either
    /// `ConnectionSucceeded, Connected` or `ConnectionFailed`.
    pub async fn connect(&self, params: C::Params) -> ConnectResult<C::Message> {
        let _lifecycle = self.lifecycle.lock().await;

        if let Err(error) = self.check_not_closing_or_closed() {
            return ConnectResult::Error(Arc::new(error));
        }

        if let Err(error) = self.disconnect_locked().await {
            // Best-effort: a failing teardown must not veto the attempt.
            debug!(error = %error, "ignoring disconnect failure before connect");
        }

        self.publish(ClientState::Connecting(params.clone()));

        let handler = self.current_handler();
        match handler.do_connect(&params).await {
            HandlerConnect::Succeeded { response, handler } => {
                if !self.install_handler(Arc::clone(&handler)) {
                    // The client closed underneath us; the fresh
                    // connection must not outlive it.
                    handler.close().await;
                    return ConnectResult::Error(Arc::new(ClientError::Closed));
                }
                self.publish(ClientState::ConnectionSucceeded(response.clone()));
                self.publish(ClientState::Connected);
                debug!("login succeeded");
                ConnectResult::Succeeded(response)
            }
            HandlerConnect::Failed { message } => {
                self.publish(ClientState::ConnectionFailed(ConnectFailure::rejected(
                    message.clone(),
                )));
                debug!("login rejected by server");
                ConnectResult::Failed(message)
            }
            HandlerConnect::Error { error } => {
                let error = Arc::new(error);
                self.publish(ClientState::ConnectionFailed(ConnectFailure::errored(
                    Arc::clone(&error),
                )));
                debug!(error = %error, "login failed");
                ConnectResult::Error(error)
            }
        }
    }

    /// Tear down the current connection, if any, and return to
    /// `Disconnected`.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::Closed`] once the client is closing or
    /// closed.
    pub async fn disconnect(&self) -> Result<(), ClientError> {
        let _lifecycle = self.lifecycle.lock().await;
        self.check_not_closing_or_closed()?;
        self.disconnect_locked().await
    }

    /// Block up to `timeout` for the next inbound message.
    ///
    /// # Errors
    ///
    /// Fails with [`ClientError::Closed`], [`ClientError::NotConnected`],
    /// or a transport error.
    pub async fn receive(
        &self,
        timeout: Duration,
    ) -> Result<ReadOutcome<C::Message>, ClientError> {
        self.check_not_closing_or_closed()?;
        self.current_handler().receive(timeout).await
    }

    /// Dispatch `message`, remembering the pairing for later correlation.
    ///
    /// # Errors
    ///
    /// As for [`Client::receive`].
    pub async fn send(&self, message: C::Message) -> Result<(), ClientError> {
        self.check_not_closing_or_closed()?;
        self.current_handler().send(message).await
    }

    /// Dispatch `message` without remembering the pairing.
    ///
    /// # Errors
    ///
    /// As for [`Client::receive`].
    pub async fn send_and_forget(&self, message: C::Message) -> Result<(), ClientError> {
        self.check_not_closing_or_closed()?;
        self.current_handler().send_and_forget(message).await
    }

    /// Dispatch `message` and block until the correlated response arrives
    /// or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// As for [`Client::receive`], plus [`TransportError::Timeout`] and
    /// [`TransportError::ReceiveQueueOverflow`].
    ///
    /// [`TransportError::Timeout`]: crate::error::TransportError::Timeout
    /// [`TransportError::ReceiveQueueOverflow`]: crate::error::TransportError::ReceiveQueueOverflow
    pub async fn send_and_wait(
        &self,
        message: C::Message,
        timeout: Duration,
    ) -> Result<C::Message, ClientError> {
        self.check_not_closing_or_closed()?;
        self.current_handler().send_and_wait(message, timeout).await
    }

    /// Close the client permanently.
    ///
    /// The current handler (and with it any live transport) is torn down,
    /// one final `Closed` value is published, and the state stream
    /// completes. Idempotent: repeat calls do nothing. A `connect` racing
    /// this call either completes first (and its connection is torn down
    /// here) or observes the closed client and fails.
    pub async fn close(&self) {
        let _lifecycle = self.lifecycle.lock().await;

        {
            let mut shared = self.lock_shared();
            if shared.state.is_closing_or_closed() {
                return;
            }
            trace!(from = shared.state.name(), "close requested");
            shared.state = ClientState::Closing;
        }

        let handler = self.current_handler();
        handler.close().await;

        {
            let mut shared = self.lock_shared();
            shared.handler = Arc::clone(&self.disconnected);
            shared.state = ClientState::Closed;
        }
        self.publisher.submit(&ClientState::Closed);
        self.publisher.complete();
        trace!("close completed");
    }

    /// Teardown shared by `disconnect` and the opportunistic pre-connect
    /// disconnect. Caller holds the lifecycle lock.
    async fn disconnect_locked(&self) -> Result<(), ClientError> {
        let handler = self.current_handler();
        if !handler.is_closed() {
            handler.close().await;
        } else if Arc::ptr_eq(&handler, &self.disconnected) {
            return Ok(());
        }
        // Either we just closed a live connection, or the transport died
        // underneath the connected handler; both end at Disconnected.
        self.install_handler(Arc::clone(&self.disconnected));
        self.publish(ClientState::Disconnected);
        Ok(())
    }

    /// Check that this client is not closing and has not closed.
    fn check_not_closing_or_closed(&self) -> Result<(), ClientError> {
        if self.lock_shared().state.is_closing_or_closed() {
            return Err(ClientError::Closed);
        }
        Ok(())
    }

    /// Mutate the state and notify subscribers, serialised by the shared
    /// mutex. Once the client is closing or closed no further transition
    /// can be published; would-be emissions are dropped.
    fn publish(&self, next: ClientState<C::Message, C::Params>) {
        let mut shared = self.lock_shared();
        if shared.state.is_closing_or_closed() {
            return;
        }
        trace!(from = shared.state.name(), to = next.name(), "state transition");
        self.publisher.submit(&next);
        shared.state = next;
    }

    fn current_handler(&self) -> DynHandler<C> { Arc::clone(&self.lock_shared().handler) }

    /// Replace the current handler. The write shares the state mutex so
    /// handler swaps serialise with state transitions. Returns `false`
    /// without installing once the client is closing or closed; the
    /// caller is then responsible for closing the rejected handler.
    fn install_handler(&self, handler: DynHandler<C>) -> bool {
        let mut shared = self.lock_shared();
        if shared.state.is_closing_or_closed() {
            return false;
        }
        shared.handler = handler;
        true
    }

    fn lock_shared(&self) -> MutexGuard<'_, Shared<C>> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C: Connector> fmt::Debug for Client<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("state", &self.lock_shared().state.name())
            .finish_non_exhaustive()
    }
}
