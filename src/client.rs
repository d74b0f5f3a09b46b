//! One-shot demo client: send a message, read a single reply.

use std::io;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::warn;

/// Largest reply read back from the server.
pub const REPLY_BUFFER_SIZE: usize = 1024;

/// Connect to `addr`, send `message` as-is and return the first reply.
///
/// Only a failed connect is an error. A failed write or read is logged and
/// yields whatever was received, possibly nothing.
pub async fn send_once(addr: &str, message: &str) -> io::Result<String> {
    let mut stream = TcpStream::connect(addr).await?;

    if let Err(e) = stream.write_all(message.as_bytes()).await {
        warn!(error = %e, "Failed to send message");
    }

    let mut buffer = [0u8; REPLY_BUFFER_SIZE];
    let n = match stream.read(&mut buffer).await {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "Failed to read reply");
            0
        }
    };

    Ok(String::from_utf8_lossy(&buffer[..n]).into_owned())
}

/// The line printed for a reply.
pub fn format_reply(reply: &str) -> String {
    format!("Server reply: {reply}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::echo;
    use crate::line::DEFAULT_MAX_LINE_LENGTH;
    use crate::listener;

    async fn start_echo_server() -> String {
        let listener = listener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(echo::serve(listener, DEFAULT_MAX_LINE_LENGTH));
        addr.to_string()
    }

    #[tokio::test]
    async fn test_send_once_against_echo_server() {
        let addr = start_echo_server().await;

        let reply = send_once(&addr, "hello\n").await.unwrap();
        assert_eq!(reply, "Echo: hello\n");
        assert_eq!(format_reply(&reply), "Server reply: Echo: hello\n");
    }

    #[tokio::test]
    async fn test_connect_failure_is_an_error() {
        let listener = listener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(send_once(&addr, "hello\n").await.is_err());
    }
}
