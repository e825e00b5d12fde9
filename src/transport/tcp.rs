//! Framed TCP transport.
//!
//! Frames are length-delimited; payloads are encoded via
//! [`WireMessage`]. A dedicated reader task drains the read half into an
//! unbounded in-memory inbox, and an outstanding-request map pairs
//! arrivals with previously-sent requests so `receive` can report
//! [`ReadOutcome::Response`] outcomes.

use std::{net::SocketAddr, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::{
    net::{TcpStream, tcp::OwnedWriteHalf},
    sync::{Mutex, mpsc},
    time::{Instant, timeout},
};
use tokio_util::{
    codec::{FramedRead, FramedWrite, LengthDelimitedCodec},
    sync::CancellationToken,
};
use tracing::debug;

use super::{ReadOutcome, Transport, outstanding::OutstandingRequests, queue::ReceiveQueue};
use crate::{
    error::TransportError,
    message::WireMessage,
};

/// Settings for a [`TcpTransport`].
#[derive(Clone, Copy, Debug)]
pub struct TcpTransportConfig {
    max_frame_length: usize,
    receive_queue_capacity: usize,
}

impl TcpTransportConfig {
    /// Maximum length of a single frame, in bytes. Inbound frames larger
    /// than this are an unrecoverable read error.
    #[must_use]
    pub const fn max_frame_length(mut self, max_frame_length: usize) -> Self {
        self.max_frame_length = max_frame_length;
        self
    }

    /// Bound on the correlation receive queue used by `send_and_wait`.
    #[must_use]
    pub const fn receive_queue_capacity(mut self, receive_queue_capacity: usize) -> Self {
        self.receive_queue_capacity = receive_queue_capacity;
        self
    }

    /// Inspect the configured maximum frame length.
    #[must_use]
    pub const fn max_frame_length_value(&self) -> usize { self.max_frame_length }

    /// Inspect the configured receive queue bound.
    #[must_use]
    pub const fn receive_queue_capacity_value(&self) -> usize { self.receive_queue_capacity }
}

impl Default for TcpTransportConfig {
    fn default() -> Self {
        Self {
            max_frame_length: 64 * 1024,
            receive_queue_capacity: 256,
        }
    }
}

/// A [`Transport`] over a framed TCP stream.
#[derive(Debug)]
pub struct TcpTransport<M> {
    writer: Mutex<FramedWrite<OwnedWriteHalf, LengthDelimitedCodec>>,
    inbox: Mutex<mpsc::UnboundedReceiver<M>>,
    stash: ReceiveQueue<M>,
    outstanding: OutstandingRequests<M>,
    cancel: CancellationToken,
}

impl<M: WireMessage + Clone> TcpTransport<M> {
    /// Connect to `addr` and start the reader task.
    ///
    /// # Errors
    ///
    /// Fails with [`TransportError::Io`] when the TCP connection cannot be
    /// established.
    pub async fn connect(
        addr: SocketAddr,
        config: TcpTransportConfig,
    ) -> Result<Self, TransportError> {
        let stream = TcpStream::connect(addr).await?;
        Ok(Self::from_stream(stream, config))
    }

    /// Wrap an already-connected stream and start the reader task.
    #[must_use]
    pub fn from_stream(stream: TcpStream, config: TcpTransportConfig) -> Self {
        let (read_half, write_half) = stream.into_split();

        let codec = || {
            LengthDelimitedCodec::builder()
                .max_frame_length(config.max_frame_length)
                .new_codec()
        };
        let framed_read = FramedRead::new(read_half, codec());
        let framed_write = FramedWrite::new(write_half, codec());

        let cancel = CancellationToken::new();
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        tokio::spawn(read_loop(framed_read, inbox_tx, cancel.clone()));

        Self {
            writer: Mutex::new(framed_write),
            inbox: Mutex::new(inbox_rx),
            stash: ReceiveQueue::new(config.receive_queue_capacity),
            outstanding: OutstandingRequests::new(),
            cancel,
        }
    }

    fn check_open(&self) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        Ok(())
    }

    /// Pair an arrival with its outstanding request, if one is recorded.
    fn correlate(&self, arrived: M) -> ReadOutcome<M> {
        match self.outstanding.take_match(&arrived) {
            Some(request) => ReadOutcome::Response {
                request,
                response: arrived,
            },
            None => ReadOutcome::Received(arrived),
        }
    }

    async fn write_frame(&self, message: &M) -> Result<(), TransportError> {
        self.check_open()?;
        let bytes = message.to_bytes().map_err(TransportError::Encode)?;

        let mut writer = self.writer.lock().await;
        if let Err(error) = writer.send(Bytes::from(bytes)).await {
            drop(writer);
            // An unrecoverable write error kills the connection.
            self.close().await;
            return Err(TransportError::Io(error));
        }
        Ok(())
    }
}

/// Drain inbound frames into the inbox until EOF, a read error, or
/// cancellation. Any exit closes the transport.
async fn read_loop<M: WireMessage>(
    mut framed: FramedRead<tokio::net::tcp::OwnedReadHalf, LengthDelimitedCodec>,
    inbox: mpsc::UnboundedSender<M>,
    cancel: CancellationToken,
) {
    loop {
        let frame = tokio::select! {
            () = cancel.cancelled() => break,
            frame = framed.next() => frame,
        };

        match frame {
            Some(Ok(bytes)) => match M::from_bytes(&bytes) {
                Ok(message) => {
                    if inbox.send(message).is_err() {
                        break;
                    }
                }
                Err(error) => {
                    debug!(error = %error, "failed to decode inbound frame");
                    break;
                }
            },
            Some(Err(error)) => {
                debug!(error = %error, "transport read failed");
                break;
            }
            None => break,
        }
    }
    cancel.cancel();
}

#[async_trait]
impl<M: WireMessage + Clone> Transport<M> for TcpTransport<M> {
    async fn receive(&self, timeout_after: Duration) -> Result<ReadOutcome<M>, TransportError> {
        self.check_open()?;

        if let Some(stashed) = self.stash.pop() {
            return Ok(self.correlate(stashed));
        }

        let mut inbox = self.inbox.lock().await;
        tokio::select! {
            () = self.cancel.cancelled() => Err(TransportError::Closed),
            polled = timeout(timeout_after, inbox.recv()) => match polled {
                Ok(Some(message)) => Ok(self.correlate(message)),
                Ok(None) => {
                    self.cancel.cancel();
                    Err(TransportError::Closed)
                }
                Err(_elapsed) => Ok(ReadOutcome::Nothing),
            },
        }
    }

    async fn send(&self, message: M) -> Result<(), TransportError> {
        self.write_frame(&message).await?;
        self.outstanding.record(&message);
        Ok(())
    }

    async fn send_and_forget(&self, message: M) -> Result<(), TransportError> {
        self.write_frame(&message).await
    }

    async fn send_and_wait(
        &self,
        message: M,
        timeout_after: Duration,
    ) -> Result<M, TransportError> {
        self.send(message.clone()).await?;

        let id = message.message_id();
        let deadline = Instant::now() + timeout_after;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                self.outstanding.remove(id);
                return Err(TransportError::Timeout(timeout_after));
            }

            let mut inbox = self.inbox.lock().await;
            let polled = tokio::select! {
                () = self.cancel.cancelled() => {
                    self.outstanding.remove(id);
                    return Err(TransportError::Closed);
                }
                polled = timeout(remaining, inbox.recv()) => polled,
            };
            drop(inbox);

            match polled {
                Ok(Some(arrived)) if arrived.is_response_for(&message) => {
                    self.outstanding.remove(id);
                    return Ok(arrived);
                }
                Ok(Some(arrived)) => {
                    if let Err(overflow) = self.stash.push(arrived) {
                        self.outstanding.remove(id);
                        return Err(overflow);
                    }
                }
                Ok(None) => {
                    self.cancel.cancel();
                    self.outstanding.remove(id);
                    return Err(TransportError::Closed);
                }
                Err(_elapsed) => {
                    self.outstanding.remove(id);
                    return Err(TransportError::Timeout(timeout_after));
                }
            }
        }
    }

    fn is_closed(&self) -> bool { self.cancel.is_cancelled() }

    async fn close(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();

        let mut writer = self.writer.lock().await;
        if let Err(error) = writer.close().await {
            debug!(error = %error, "error closing transport writer");
        }
        self.outstanding.clear();
    }
}
