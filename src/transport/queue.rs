//! Bounded correlation receive queue.
//!
//! While a `send_and_wait` is in flight, messages that are not the awaited
//! response land here so a later `receive` can deliver them in arrival
//! order. The bound protects the waiter from an unbounded pile-up; overflow
//! is an error to the waiter, never backpressure on the wire.

use std::{collections::VecDeque, sync::Mutex};

use crate::error::TransportError;

/// A mutex-guarded bounded FIFO of uncorrelated messages.
#[derive(Debug)]
pub struct ReceiveQueue<M> {
    messages: Mutex<VecDeque<M>>,
    capacity: usize,
}

impl<M> ReceiveQueue<M> {
    /// Create a queue holding at most `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Append a message.
    ///
    /// # Errors
    ///
    /// Fails with [`TransportError::ReceiveQueueOverflow`] when the queue
    /// is already at capacity; the message is dropped.
    pub fn push(&self, message: M) -> Result<(), TransportError> {
        let mut messages = self.lock();
        if messages.len() >= self.capacity {
            return Err(TransportError::ReceiveQueueOverflow(self.capacity));
        }
        messages.push_back(message);
        Ok(())
    }

    /// Remove and return the oldest message, if any.
    pub fn pop(&self) -> Option<M> { self.lock().pop_front() }

    /// Return the number of queued messages.
    pub fn len(&self) -> usize { self.lock().len() }

    /// Return `true` when no messages are queued.
    pub fn is_empty(&self) -> bool { self.lock().is_empty() }

    /// Return the configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize { self.capacity }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<M>> {
        // A poisoned queue mutex means a panic mid-push/pop of a plain
        // VecDeque; the structure itself is still consistent.
        self.messages
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}
