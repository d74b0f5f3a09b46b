//! Registry of connected chat clients.
//!
//! Every read, write and iteration goes through a single async mutex. The
//! broadcaster holds that lock for a whole fan-out pass, so a slow client
//! delays every other registry operation until its write completes.

use slab::Slab;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Identity of a registered connection.
///
/// Slab slots are reused after removal, so each id also carries a serial
/// number; a stale id never matches the connection that took its slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId {
    slot: usize,
    serial: u64,
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.slot, self.serial)
    }
}

/// A registered connection: its label and the write half of its stream.
#[derive(Debug)]
pub struct Member<W> {
    serial: u64,
    label: String,
    /// Outbound half of the connection.
    pub writer: W,
}

impl<W> Member<W> {
    pub fn label(&self) -> &str {
        &self.label
    }
}

/// Shared table of connected clients.
pub struct Registry<W = OwnedWriteHalf> {
    members: Mutex<Slab<Member<W>>>,
    next_serial: AtomicU64,
}

impl<W> Default for Registry<W> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W> Registry<W> {
    pub fn new() -> Self {
        Self {
            members: Mutex::new(Slab::new()),
            next_serial: AtomicU64::new(0),
        }
    }

    /// Register a connection under `label`, taking ownership of its writer.
    pub async fn add(&self, writer: W, label: impl Into<String>) -> ConnectionId {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        self.lock().await.insert(serial, label.into(), writer)
    }

    /// Deregister a connection, handing its writer back to the caller.
    ///
    /// Removing an id that is no longer registered is a no-op.
    pub async fn remove(&self, id: ConnectionId) -> Option<W> {
        let mut members = self.members.lock().await;
        let registered = members
            .get(id.slot)
            .is_some_and(|member| member.serial == id.serial);
        if !registered {
            return None;
        }
        Some(members.remove(id.slot).writer)
    }

    /// Acquire the registry lock.
    ///
    /// The returned guard gives exclusive access to every member until it is
    /// dropped. Do not call any other registry method while holding it.
    pub async fn lock(&self) -> RegistryGuard<'_, W> {
        RegistryGuard {
            members: self.members.lock().await,
        }
    }

    /// Number of registered connections.
    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.members.lock().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.members.lock().await.is_empty()
    }

    /// Labels of all registered connections.
    #[cfg(test)]
    pub async fn labels(&self) -> Vec<String> {
        self.lock()
            .await
            .members()
            .map(|m| m.label.clone())
            .collect()
    }
}

impl<W: AsyncWrite + Unpin> Registry<W> {
    /// Register a connection and write `welcome` to it before the lock is
    /// released, so no broadcast can reach the client ahead of its welcome.
    ///
    /// The connection stays registered even if the welcome write fails.
    pub async fn add_with_welcome(
        &self,
        writer: W,
        label: impl Into<String>,
        welcome: &[u8],
    ) -> (ConnectionId, std::io::Result<()>) {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let mut guard = self.lock().await;
        let id = guard.insert(serial, label.into(), writer);
        let written = guard.write_to(id, welcome).await.map(|_| ());
        (id, written)
    }

    /// Write `buf` to a single registered connection under the lock.
    ///
    /// Returns `Ok(false)` if the connection is no longer registered.
    pub async fn write_to(&self, id: ConnectionId, buf: &[u8]) -> std::io::Result<bool> {
        self.lock().await.write_to(id, buf).await
    }
}

/// Exclusive access to the registry. The lock is released on drop, on
/// every exit path.
pub struct RegistryGuard<'a, W> {
    members: MutexGuard<'a, Slab<Member<W>>>,
}

impl<W> RegistryGuard<'_, W> {
    fn insert(&mut self, serial: u64, label: String, writer: W) -> ConnectionId {
        trace!(label = %label, "Registering connection");
        let slot = self.members.insert(Member {
            serial,
            label,
            writer,
        });
        ConnectionId { slot, serial }
    }

    /// Visit every registered member.
    #[cfg(test)]
    pub fn members(&self) -> impl Iterator<Item = &Member<W>> {
        self.members.iter().map(|(_, m)| m)
    }

    /// Visit every registered member mutably, with its id.
    pub fn members_mut(&mut self) -> impl Iterator<Item = (ConnectionId, &mut Member<W>)> {
        self.members.iter_mut().map(|(slot, m)| {
            (
                ConnectionId {
                    slot,
                    serial: m.serial,
                },
                m,
            )
        })
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.members.len()
    }
}

impl<W: AsyncWrite + Unpin> RegistryGuard<'_, W> {
    /// Write `buf` to one member, if it is still registered.
    pub async fn write_to(&mut self, id: ConnectionId, buf: &[u8]) -> std::io::Result<bool> {
        match self.members.get_mut(id.slot) {
            Some(member) if member.serial == id.serial => {
                member.writer.write_all(buf).await?;
                member.writer.flush().await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
