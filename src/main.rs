//! linecast: line-oriented TCP servers
//!
//! Two servers share one binary:
//! - `chat`: every line a client sends is broadcast to all connected clients
//! - `echo`: every line a client sends is echoed back to that client
//!
//! Configuration via CLI arguments or TOML file.

use linecast::chat::ChatServer;
use linecast::config::{Config, ServerMode};
use linecast::echo;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        mode = ?config.mode,
        queue_capacity = config.queue_capacity,
        max_line_length = config.max_line_length,
        "Starting linecast server"
    );

    let result = match config.mode {
        ServerMode::Chat => ChatServer::new(&config).run().await,
        ServerMode::Echo => echo::run(&config.listen, config.max_line_length).await,
    };

    if let Err(e) = result {
        error!(address = %config.listen, error = %e, "Error starting server");
        return Err(e.into());
    }

    Ok(())
}
