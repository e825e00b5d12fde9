//! In-process loopback transport.
//!
//! A duplex pair of unbounded channels: the client side is a full
//! [`Transport`], the peer side is a plain handle a test server task can
//! drive. The loopback reports every arrival as
//! [`ReadOutcome::Received`] — the valid minimal implementation — and
//! correlates only inside `send_and_wait`, via the message predicate.

use std::time::Duration;

use async_trait::async_trait;
use tokio::{
    sync::{mpsc, Mutex},
    time::{timeout, Instant},
};
use tokio_util::sync::CancellationToken;

use super::{queue::ReceiveQueue, ReadOutcome, Transport};
use crate::{error::TransportError, message::Message};

/// The client side of an in-process duplex pair.
#[derive(Debug)]
pub struct LoopbackTransport<M> {
    outbound: mpsc::UnboundedSender<M>,
    inbox: Mutex<mpsc::UnboundedReceiver<M>>,
    stash: ReceiveQueue<M>,
    cancel: CancellationToken,
}

/// The peer side of an in-process duplex pair.
///
/// Intended for test servers: receive what the transport sent, send what
/// the transport should receive.
#[derive(Debug)]
pub struct LoopbackPeer<M> {
    outbound: mpsc::UnboundedSender<M>,
    inbound: mpsc::UnboundedReceiver<M>,
}

impl<M: Message + Clone> LoopbackTransport<M> {
    /// Create a connected transport/peer pair.
    ///
    /// `receive_queue_capacity` bounds the correlation receive queue used
    /// by `send_and_wait` to stash out-of-order arrivals.
    #[must_use]
    pub fn pair(receive_queue_capacity: usize) -> (Self, LoopbackPeer<M>) {
        let (to_peer_tx, to_peer_rx) = mpsc::unbounded_channel();
        let (to_client_tx, to_client_rx) = mpsc::unbounded_channel();

        let transport = Self {
            outbound: to_peer_tx,
            inbox: Mutex::new(to_client_rx),
            stash: ReceiveQueue::new(receive_queue_capacity),
            cancel: CancellationToken::new(),
        };
        let peer = LoopbackPeer {
            outbound: to_client_tx,
            inbound: to_peer_rx,
        };
        (transport, peer)
    }

    fn check_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    fn dispatch(&self, message: M) -> Result<(), TransportError> {
        self.check_open()?;
        if self.outbound.send(message).is_err() {
            // The peer is gone; the transport is dead from here on.
            self.cancel.cancel();
            return Err(TransportError::Closed);
        }
        Ok(())
    }
}

#[async_trait]
impl<M: Message + Clone> Transport<M> for LoopbackTransport<M> {
    async fn receive(&self, timeout_after: Duration) -> Result<ReadOutcome<M>, TransportError> {
        self.check_open()?;

        if let Some(stashed) = self.stash.pop() {
            return Ok(ReadOutcome::Received(stashed));
        }

        let mut inbox = self.inbox.lock().await;
        tokio::select! {
            () = self.cancel.cancelled() => Err(TransportError::Closed),
            polled = timeout(timeout_after, inbox.recv()) => match polled {
                Ok(Some(message)) => Ok(ReadOutcome::Received(message)),
                Ok(None) => {
                    self.cancel.cancel();
                    Err(TransportError::Closed)
                }
                Err(_elapsed) => Ok(ReadOutcome::Nothing),
            },
        }
    }

    async fn send(&self, message: M) -> Result<(), TransportError> { self.dispatch(message) }

    async fn send_and_forget(&self, message: M) -> Result<(), TransportError> {
        self.dispatch(message)
    }

    async fn send_and_wait(
        &self,
        message: M,
        timeout_after: Duration,
    ) -> Result<M, TransportError> {
        self.dispatch(message.clone())?;

        let deadline = Instant::now() + timeout_after;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportError::Timeout(timeout_after));
            }

            let mut inbox = self.inbox.lock().await;
            let polled = tokio::select! {
                () = self.cancel.cancelled() => return Err(TransportError::Closed),
                polled = timeout(remaining, inbox.recv()) => polled,
            };
            drop(inbox);

            match polled {
                Ok(Some(arrived)) if arrived.is_response_for(&message) => return Ok(arrived),
                Ok(Some(arrived)) => self.stash.push(arrived)?,
                Ok(None) => {
                    self.cancel.cancel();
                    return Err(TransportError::Closed);
                }
                Err(_elapsed) => return Err(TransportError::Timeout(timeout_after)),
            }
        }
    }

    fn is_closed(&self) -> bool { self.cancel.is_cancelled() }

    async fn close(&self) { self.cancel.cancel(); }
}

impl<M: Message> LoopbackPeer<M> {
    /// Deliver a message to the transport side. Silently dropped if the
    /// transport has gone away.
    pub fn send(&self, message: M) { let _ = self.outbound.send(message); }

    /// Take the next message the transport sent, or `None` once the
    /// transport side has been dropped.
    pub async fn recv(&mut self) -> Option<M> { self.inbound.recv().await }
}
