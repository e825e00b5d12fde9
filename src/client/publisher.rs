//! Hot publication of lifecycle states.
//!
//! One bounded queue per subscriber, submitted to non-blockingly: a slow
//! subscriber loses notifications instead of delaying the producer. After
//! completion every stream terminates once drained, and later submissions
//! are dropped.

use std::sync::Mutex;

use futures::Stream;
use tokio::sync::mpsc;
use tracing::warn;

use super::state::ClientState;

/// A multicast hot stream of [`ClientState`] values.
pub(crate) struct StatePublisher<M, P> {
    subscribers: Mutex<Subscribers<M, P>>,
    buffer: usize,
}

struct Subscribers<M, P> {
    queues: Vec<mpsc::Sender<ClientState<M, P>>>,
    completed: bool,
}

impl<M: Clone, P: Clone> StatePublisher<M, P> {
    /// Create a publisher whose subscriber queues hold `buffer` values.
    pub(crate) fn new(buffer: usize) -> Self {
        Self {
            subscribers: Mutex::new(Subscribers {
                queues: Vec::new(),
                completed: false,
            }),
            buffer,
        }
    }

    /// Register a new subscriber.
    ///
    /// Subscribing after completion yields a stream that terminates
    /// immediately.
    pub(crate) fn subscribe(&self) -> StateStream<M, P> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut subscribers = self.lock();
        if !subscribers.completed {
            subscribers.queues.push(tx);
        }
        StateStream { receiver: rx }
    }

    /// Deliver `state` to every subscriber without blocking.
    ///
    /// A full subscriber queue drops this notification for that
    /// subscriber; a disconnected subscriber is forgotten.
    pub(crate) fn submit(&self, state: &ClientState<M, P>) {
        let mut subscribers = self.lock();
        if subscribers.completed {
            return;
        }
        subscribers.queues.retain(|queue| {
            match queue.try_send(state.clone()) {
                Ok(()) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(state = state.name(), "dropping state notification for slow subscriber");
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => false,
            }
        });
    }

    /// Complete the stream: every subscriber terminates once drained and
    /// all later submissions are dropped.
    pub(crate) fn complete(&self) {
        let mut subscribers = self.lock();
        subscribers.completed = true;
        subscribers.queues.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Subscribers<M, P>> {
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// A subscriber's view of the state stream.
///
/// Yields states in publication order and terminates after the publisher
/// completes.
#[derive(Debug)]
pub struct StateStream<M, P> {
    receiver: mpsc::Receiver<ClientState<M, P>>,
}

impl<M, P> StateStream<M, P> {
    /// Wait for the next published state, or `None` once the stream has
    /// completed.
    pub async fn recv(&mut self) -> Option<ClientState<M, P>> { self.receiver.recv().await }

    /// Take the next already-published state without waiting.
    pub fn try_recv(&mut self) -> Option<ClientState<M, P>> { self.receiver.try_recv().ok() }
}

impl<M, P> Stream for StateStream<M, P> {
    type Item = ClientState<M, P>;

    fn poll_next(
        mut self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.receiver.poll_recv(cx)
    }
}
