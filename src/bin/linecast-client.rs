//! Demo client: send one message to a linecast server and print the reply.

use clap::Parser;
use linecast::client;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "linecast-client")]
#[command(version = "0.1.0")]
#[command(about = "Send one message to a linecast server", long_about = None)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "localhost:3000")]
    connect: String,

    /// Message to send
    #[arg(short, long, default_value = "Hello, Server")]
    message: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let args = Args::parse();

    let reply = client::send_once(&args.connect, &args.message).await?;
    println!("{}", client::format_reply(&reply));
    Ok(())
}
