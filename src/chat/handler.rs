//! Per-connection task for the chat server.

use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

use super::queue::{MessageEntry, QueueClosed, QueueProducer};
use super::registry::Registry;
use super::ChatState;
use crate::line::{self, LineRead};

const LINE_CAPACITY: usize = 1024;

/// Handle an accepted chat connection until its read side fails.
pub async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: Arc<ChatState>) {
    let (reader, writer) = stream.into_split();
    serve_client(
        reader,
        writer,
        peer.to_string(),
        &state.registry,
        &state.producer,
        state.welcome.as_bytes(),
        state.max_line_length,
    )
    .await;
}

/// Register the client, greet it, then forward each complete line it sends
/// to the message queue.
///
/// Returns once the client can no longer be read from. By then the client
/// has been removed from the registry and its writer shut down. A line
/// longer than `max_line_length` bytes ends the connection.
pub async fn serve_client<R, W>(
    reader: R,
    writer: W,
    label: String,
    registry: &Registry<W>,
    producer: &QueueProducer,
    welcome: &[u8],
    max_line_length: usize,
) where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (id, welcomed) = registry.add_with_welcome(writer, label.as_str(), welcome).await;
    info!(peer = %label, conn = %id, "Client connected");

    if let Err(e) = welcomed {
        warn!(peer = %label, error = %e, "Failed to send welcome");
    }

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(LINE_CAPACITY);

    loop {
        match line::read_line(&mut reader, &mut buf, max_line_length).await {
            Ok(LineRead::Line) => {
                let text = String::from_utf8_lossy(&buf);
                trace!(peer = %label, line = %text.trim_end(), "Received line");

                let entry = MessageEntry::new(label.as_str(), Bytes::copy_from_slice(&buf));
                if let Err(QueueClosed(entry)) = producer.push(entry).await {
                    let text = String::from_utf8_lossy(entry.payload_line());
                    warn!(
                        peer = %label,
                        line = %text.trim_end(),
                        "Message queue closed, dropping line"
                    );
                    break;
                }
            }
            Ok(LineRead::Eof) => {
                debug!(peer = %label, "Connection closed by client");
                break;
            }
            Ok(LineRead::Partial(n)) => {
                debug!(peer = %label, discarded = n, "Dropping unterminated line");
                break;
            }
            Ok(LineRead::TooLong) => {
                warn!(peer = %label, limit = max_line_length, "Line too long, closing connection");
                break;
            }
            Err(e) => {
                debug!(peer = %label, error = %e, "Read failed");
                break;
            }
        }
    }

    if let Some(mut writer) = registry.remove(id).await {
        if let Err(e) = writer.shutdown().await {
            debug!(peer = %label, error = %e, "Failed to shut down writer");
        }
    }
    info!(peer = %label, conn = %id, "Client disconnected");
}
