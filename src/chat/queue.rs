//! Bounded message queue between connection readers and the broadcaster.
//!
//! Many producers (one per connection), exactly one consumer. The single
//! consumer is enforced by the type system: [`QueueConsumer`] is not `Clone`.

use bytes::{Bytes, BytesMut};
use std::fmt;
use tokio::sync::mpsc;

/// Default number of entries the queue holds before producers block.
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

const RENDER_PREFIX: &[u8] = b"Client ";
const RENDER_SEPARATOR: &[u8] = b": ";

/// A line received from one client, waiting to be broadcast.
///
/// The payload is kept exactly as read from the socket; it is not required
/// to be valid UTF-8.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageEntry {
    sender_label: String,
    payload_line: Bytes,
}

impl MessageEntry {
    /// Create an entry. `payload_line` keeps its trailing terminator.
    pub fn new(sender_label: impl Into<String>, payload_line: impl Into<Bytes>) -> Self {
        Self {
            sender_label: sender_label.into(),
            payload_line: payload_line.into(),
        }
    }

    pub fn sender_label(&self) -> &str {
        &self.sender_label
    }

    pub fn payload_line(&self) -> &[u8] {
        &self.payload_line
    }

    /// Format the entry as it goes out on the wire:
    /// `Client <label>: <line>`, with the line bytes untouched.
    pub fn render(&self) -> Bytes {
        let mut out = BytesMut::with_capacity(
            RENDER_PREFIX.len()
                + self.sender_label.len()
                + RENDER_SEPARATOR.len()
                + self.payload_line.len(),
        );
        out.extend_from_slice(RENDER_PREFIX);
        out.extend_from_slice(self.sender_label.as_bytes());
        out.extend_from_slice(RENDER_SEPARATOR);
        out.extend_from_slice(&self.payload_line);
        out.freeze()
    }
}

/// The consumer side has gone away; the entry was not queued.
#[derive(Debug, PartialEq, Eq)]
pub struct QueueClosed(pub MessageEntry);

impl fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "message queue closed")
    }
}

impl std::error::Error for QueueClosed {}

/// Bounded FIFO of [`MessageEntry`] values.
pub struct MessageQueue;

impl MessageQueue {
    /// Create a queue holding at most `capacity` pending entries.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn bounded(capacity: usize) -> (QueueProducer, QueueConsumer) {
        let (tx, rx) = mpsc::channel(capacity);
        (QueueProducer { tx }, QueueConsumer { rx })
    }
}

/// Producer handle. Cheap to clone, one per connection handler.
#[derive(Clone)]
pub struct QueueProducer {
    tx: mpsc::Sender<MessageEntry>,
}

impl QueueProducer {
    /// Enqueue an entry, waiting while the queue is full.
    pub async fn push(&self, entry: MessageEntry) -> Result<(), QueueClosed> {
        self.tx.send(entry).await.map_err(|e| QueueClosed(e.0))
    }
}

/// The single consumer handle.
pub struct QueueConsumer {
    rx: mpsc::Receiver<MessageEntry>,
}

impl QueueConsumer {
    /// Dequeue the oldest entry, waiting while the queue is empty.
    ///
    /// Returns `None` once every producer has been dropped and the queue
    /// is drained.
    pub async fn pop(&mut self) -> Option<MessageEntry> {
        self.rx.recv().await
    }

    /// Number of entries currently waiting.
    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }
}
