//! Client registry implementation
//!
//! The set of addresses that receive every broadcast frame.

use std::collections::HashSet;
use std::net::SocketAddr;

use tokio::sync::RwLock;

/// Registry of active receivers
///
/// Thread-safe via `RwLock`. The broadcast loop takes one snapshot per frame
/// and iterates the copy, so registrations arriving mid-send never disturb
/// the pass in progress.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: RwLock<HashSet<SocketAddr>>,
}

impl ClientRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a client
    ///
    /// Returns `true` if the address was not registered before.
    pub async fn register(&self, addr: SocketAddr) -> bool {
        let mut clients = self.clients.write().await;
        let added = clients.insert(addr);

        if added {
            tracing::info!(client = %addr, clients = clients.len(), "Client registered");
        } else {
            tracing::debug!(client = %addr, "Client already registered");
        }

        added
    }

    /// Remove a client
    ///
    /// Removing an unknown address is a no-op. Returns `true` if it was present.
    pub async fn unregister(&self, addr: &SocketAddr) -> bool {
        let mut clients = self.clients.write().await;
        let removed = clients.remove(addr);

        if removed {
            tracing::info!(client = %addr, clients = clients.len(), "Client unregistered");
        }

        removed
    }

    /// Copy of the current membership
    pub async fn snapshot(&self) -> Vec<SocketAddr> {
        self.clients.read().await.iter().copied().collect()
    }

    /// Check whether an address is registered
    pub async fn contains(&self, addr: &SocketAddr) -> bool {
        self.clients.read().await.contains(addr)
    }

    /// Number of registered clients
    pub async fn len(&self) -> usize {
        self.clients.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.clients.read().await.is_empty()
    }
}
