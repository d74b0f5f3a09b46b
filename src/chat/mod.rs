//! Broadcast chat server.
//!
//! Every accepted connection gets its own reader task. Each complete line a
//! client sends becomes a [`queue::MessageEntry`] on a bounded
//! [`MessageQueue`]; a single [`Broadcaster`] drains that queue and writes
//! every entry to all clients in the [`Registry`], the sender included.
//!
//! ```text
//! accept -> register -> welcome -> read lines -> queue
//!                                                 |
//!        registry (locked) <- fan-out <- broadcaster
//! ```
//!
//! A client is removed from the registry only when reading from it fails.
//! Failed writes are logged and otherwise ignored.

pub mod broadcaster;
pub mod handler;
pub mod queue;
pub mod registry;

pub use broadcaster::Broadcaster;
pub use queue::{MessageQueue, QueueProducer, DEFAULT_QUEUE_CAPACITY};
pub use registry::Registry;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::Config;
use crate::listener;

/// Line sent to each client as soon as it is registered.
pub const WELCOME_LINE: &str = "Welcome to the server\n";

/// State shared by every connection handler.
pub struct ChatState {
    pub registry: Arc<Registry>,
    pub producer: QueueProducer,
    pub welcome: String,
    /// Longest line accepted from a client before it is disconnected.
    pub max_line_length: usize,
}

/// Chat server instance
pub struct ChatServer {
    listen: String,
    state: Arc<ChatState>,
    broadcaster: Broadcaster<tokio::net::tcp::OwnedWriteHalf>,
}

impl ChatServer {
    /// Create a new server instance
    pub fn new(config: &Config) -> Self {
        let registry = Arc::new(Registry::new());
        let (producer, consumer) = MessageQueue::bounded(config.queue_capacity);
        let broadcaster = Broadcaster::new(Arc::clone(&registry), consumer);

        ChatServer {
            listen: config.listen.clone(),
            state: Arc::new(ChatState {
                registry,
                producer,
                welcome: config.welcome.clone(),
                max_line_length: config.max_line_length,
            }),
            broadcaster,
        }
    }

    /// Bind the configured address and serve forever.
    pub async fn run(self) -> std::io::Result<()> {
        let listener = listener::bind(&self.listen).await?;
        self.serve(listener).await;
        Ok(())
    }

    /// Start the broadcaster and accept connections on `listener`.
    pub async fn serve(self, listener: TcpListener) {
        if let Ok(addr) = listener.local_addr() {
            info!(address = %addr, "Chat server listening");
        }

        tokio::spawn(self.broadcaster.run());

        let state = self.state;
        listener::accept_loop(&listener, |stream, peer| {
            let state = Arc::clone(&state);
            tokio::spawn(handler::handle_connection(stream, peer, state));
        })
        .await;
    }

    /// Get a reference to the registry for testing
    #[cfg(test)]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.state.registry
    }
}
