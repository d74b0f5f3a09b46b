//! Single task delivering queued entries to every registered client.

use std::sync::Arc;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace, warn};

use super::queue::{MessageEntry, QueueConsumer};
use super::registry::Registry;

/// Outcome of one fan-out pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// Drains the message queue and fans each entry out to the registry.
///
/// Deliveries never overlap: the registry lock is held for a whole pass, so
/// every client observes entries in the same order. A failed write is logged
/// and the client stays registered; only its own read failure removes it.
pub struct Broadcaster<W> {
    registry: Arc<Registry<W>>,
    consumer: QueueConsumer,
}

impl<W: AsyncWrite + Unpin> Broadcaster<W> {
    pub fn new(registry: Arc<Registry<W>>, consumer: QueueConsumer) -> Self {
        Self { registry, consumer }
    }

    /// Run until every producer is gone and the queue is drained.
    pub async fn run(mut self) {
        while let Some(entry) = self.consumer.pop().await {
            let delivery = self.deliver(&entry).await;
            let text = String::from_utf8_lossy(entry.payload_line());
            trace!(
                sender = %entry.sender_label(),
                line = %text.trim_end(),
                delivered = delivery.delivered,
                failed = delivery.failed,
                "Broadcast entry"
            );
        }
        debug!("Message queue closed, broadcaster exiting");
    }

    /// Write one entry to every connection registered right now.
    pub async fn deliver(&self, entry: &MessageEntry) -> Delivery {
        let line = entry.render();
        let mut delivery = Delivery::default();

        let mut guard = self.registry.lock().await;
        for (id, member) in guard.members_mut() {
            match write_line(&mut member.writer, &line).await {
                Ok(()) => delivery.delivered += 1,
                Err(e) => {
                    warn!(peer = %member.label(), conn = %id, error = %e, "Error writing to client");
                    delivery.failed += 1;
                }
            }
        }

        delivery
    }
}

async fn write_line<W: AsyncWrite + Unpin>(writer: &mut W, line: &[u8]) -> std::io::Result<()> {
    writer.write_all(line).await?;
    writer.flush().await
}
