//! Line echo server.
//!
//! Stateless: every line a client sends comes straight back to that client
//! prefixed with `Echo: `. Nothing is shared between connections.

use bytes::BytesMut;
use std::net::SocketAddr;
use tokio::io::{AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, info, warn};

use crate::line::{self, LineRead};
use crate::listener;

const ECHO_PREFIX: &[u8] = b"Echo: ";
const LINE_CAPACITY: usize = 1024;

/// Bind `listen` and serve echo connections forever.
pub async fn run(listen: &str, max_line_length: usize) -> std::io::Result<()> {
    let listener = listener::bind(listen).await?;
    serve(listener, max_line_length).await;
    Ok(())
}

/// Accept echo connections on `listener`.
pub async fn serve(listener: TcpListener, max_line_length: usize) {
    if let Ok(addr) = listener.local_addr() {
        info!(address = %addr, "Echo server listening");
    }

    listener::accept_loop(&listener, move |stream, peer| {
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer, max_line_length).await {
                debug!(peer = %peer, error = %e, "Connection error");
            }
            info!(peer = %peer, "Client disconnected");
        });
    })
    .await;
}

/// Echo each complete line back until the client goes away.
async fn handle_connection(
    stream: TcpStream,
    peer: SocketAddr,
    max_line_length: usize,
) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(LINE_CAPACITY);

    loop {
        match line::read_line(&mut reader, &mut buf, max_line_length).await? {
            LineRead::Line => {}
            LineRead::Eof | LineRead::Partial(_) => return Ok(()),
            LineRead::TooLong => {
                warn!(peer = %peer, limit = max_line_length, "Line too long, closing connection");
                return Ok(());
            }
        }

        let text = String::from_utf8_lossy(&buf);
        debug!(peer = %peer, line = %text.trim_end(), "Received");

        let mut response = BytesMut::with_capacity(ECHO_PREFIX.len() + buf.len());
        response.extend_from_slice(ECHO_PREFIX);
        response.extend_from_slice(&buf);
        writer.write_all(&response).await?;
    }
}
