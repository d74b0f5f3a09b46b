//! TCP listener setup and the accept loop shared by both servers.

use std::io;
use std::net::SocketAddr;
use tokio::net::{lookup_host, TcpListener, TcpStream};
use tracing::{debug, error};

/// Resolve `addr` and bind a listener on it.
///
/// IPv4 results are preferred when the name resolves to both families.
pub async fn bind(addr: &str) -> io::Result<TcpListener> {
    let candidates: Vec<SocketAddr> = lookup_host(addr).await?.collect();
    let resolved = candidates
        .iter()
        .find(|a| a.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::AddrNotAvailable,
                format!("{addr} did not resolve to any address"),
            )
        })?;

    let listener = create_listener(resolved)?;
    TcpListener::from_std(listener)
}

/// Create a non-blocking TCP listener with SO_REUSEADDR.
fn create_listener(addr: SocketAddr) -> io::Result<std::net::TcpListener> {
    let socket = socket2::Socket::new(
        match addr {
            SocketAddr::V4(_) => socket2::Domain::IPV4,
            SocketAddr::V6(_) => socket2::Domain::IPV6,
        },
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )?;

    socket.set_reuse_address(true)?;
    socket.set_nonblocking(true)?;
    socket.bind(&addr.into())?;
    socket.listen(1024)?;

    Ok(socket.into())
}

/// Accept connections forever, handing each one to `on_accept`.
///
/// Accept errors are logged and never end the loop.
pub async fn accept_loop<F>(listener: &TcpListener, mut on_accept: F)
where
    F: FnMut(TcpStream, SocketAddr),
{
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(peer = %peer, "New connection");
                on_accept(stream, peer);
            }
            Err(e) => {
                error!(error = %e, "Failed to accept connection");
            }
        }
    }
}
