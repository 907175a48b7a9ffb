//! Ordered message channel over one bidirectional stream
//!
//! A [`MessageChannel`] wraps a raw byte stream into two halves:
//! - an unbounded outbound queue, drained by a background writer task that
//!   length-prefixes each message onto the stream in push order
//! - an inbound sequence, decoded lazily from the stream in arrival order
//!
//! No reordering, batching or retransmission happens here. Callers must pull
//! exactly the messages each handshake phase requires.

use crate::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

pub mod framing;
pub mod memory;

pub use framing::{encode_frame, read_frame};
pub use memory::{channel_pair, loopback};

/// Default maximum inbound frame length (4 MiB)
pub const DEFAULT_MAX_FRAME_LEN: usize = 4 * 1024 * 1024;

/// Opaque handshake message; its meaning is given by its stream position
#[derive(Clone, PartialEq, Eq)]
pub struct ProtocolMessage(Vec<u8>);

impl ProtocolMessage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<u8>> for ProtocolMessage {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for ProtocolMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProtocolMessage({} bytes)", self.0.len())
    }
}

/// Number of queued outbound messages not yet written to the stream
#[derive(Debug, Clone, Default)]
pub struct OutboundGauge(Arc<AtomicUsize>);

impl OutboundGauge {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    /// Saturates at zero; an aborted writer may still finish one write
    fn decrement(&self) {
        let _ = self
            .0
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

/// Duplex message channel over a stream `S`
pub struct MessageChannel<S> {
    reader: BufReader<ReadHalf<S>>,
    outbound: Option<mpsc::UnboundedSender<ProtocolMessage>>,
    writer: Option<JoinHandle<Result<()>>>,
    pending: OutboundGauge,
    max_frame_len: usize,
    received: usize,
}

impl<S> MessageChannel<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    /// Wrap a stream with the default frame limit
    ///
    /// Must be called from within a tokio runtime; the writer task is spawned
    /// immediately.
    pub fn new(stream: S) -> Self {
        Self::with_max_frame_len(stream, DEFAULT_MAX_FRAME_LEN)
    }

    /// Wrap a stream with a custom inbound frame limit
    pub fn with_max_frame_len(stream: S, max_frame_len: usize) -> Self {
        let (read_half, write_half) = tokio::io::split(stream);
        let (tx, rx) = mpsc::unbounded_channel();
        let pending = OutboundGauge::default();
        let writer = tokio::spawn(write_loop(write_half, rx, pending.clone()));

        Self {
            reader: BufReader::new(read_half),
            outbound: Some(tx),
            writer: Some(writer),
            pending,
            max_frame_len,
            received: 0,
        }
    }

    /// Queue a message for sending
    pub fn send(&self, message: impl Into<ProtocolMessage>) -> Result<()> {
        let sender = self.outbound.as_ref().ok_or(Error::ChannelClosed)?;
        self.pending.increment();
        sender.send(message.into()).map_err(|_| {
            self.pending.decrement();
            Error::ChannelClosed
        })
    }

    /// Pull the next inbound message, or `None` when the peer ended the stream
    pub async fn recv(&mut self) -> Result<Option<ProtocolMessage>> {
        let frame = read_frame(&mut self.reader, self.max_frame_len).await?;
        if let Some(bytes) = &frame {
            self.received += 1;
            debug!(index = self.received, len = bytes.len(), "Inbound message");
        }
        Ok(frame.map(ProtocolMessage))
    }

    /// Number of inbound messages decoded so far
    pub fn received(&self) -> usize {
        self.received
    }

    /// Outbound backlog gauge
    pub fn gauge(&self) -> OutboundGauge {
        self.pending.clone()
    }

    /// Close the outbound queue and wait until everything queued is written
    ///
    /// The write half is shut down once the queue drains, so the peer observes
    /// a clean end of stream.
    pub async fn finish(mut self) -> Result<()> {
        self.outbound.take();
        let result = match self.writer.take() {
            Some(handle) => handle
                .await
                .unwrap_or_else(|e| Err(Error::Internal(format!("writer task failed: {}", e)))),
            None => Ok(()),
        };
        // A failed writer leaves its queue unwritten for good
        if result.is_err() {
            self.pending.reset();
        }
        result
    }

    /// Tear the channel down immediately, discarding unwritten messages
    ///
    /// Never fails. Returns how many queued messages were dropped.
    pub fn abort(mut self) -> usize {
        self.outbound.take();
        if let Some(handle) = self.writer.take() {
            handle.abort();
        }
        let discarded = self.pending.get();
        self.pending.reset();
        if discarded > 0 {
            warn!(discarded, "Discarded unwritten outbound messages");
        }
        discarded
    }
}

impl<S> Drop for MessageChannel<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.writer.take() {
            handle.abort();
        }
    }
}

async fn write_loop<W>(
    mut writer: WriteHalf<W>,
    mut rx: mpsc::UnboundedReceiver<ProtocolMessage>,
    pending: OutboundGauge,
) -> Result<()>
where
    W: AsyncWrite,
{
    while let Some(message) = rx.recv().await {
        let frame = encode_frame(message.as_bytes());
        let written = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        }
        .await;
        pending.decrement();
        written?;
        debug!(len = message.len(), "Outbound message written");
    }

    writer.shutdown().await?;
    Ok(())
}
