//! ClientRegistry: the server's record of where each client wants its data.
//!
//! Each entry maps a client's source IP (no port) to the callback port the
//! client reported when it registered.
//!
//! # Semantics
//!
//! - **Last write wins.**  A second registration from the same address
//!   replaces the earlier port; there is never more than one entry per
//!   address.
//! - **No expiry.**  Entries live until the process exits.  There is no
//!   removal operation.
//!
//! # Sharing
//!
//! The registration listener writes and an external sender reads, possibly
//! from different tasks at the same time, so the registry is always handed
//! around as a [`SharedRegistry`] (`Arc<RwLock<ClientRegistry>>`).

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::debug;

/// In-memory registry of client callback endpoints.
#[derive(Debug, Default, Clone)]
pub struct ClientRegistry {
    clients: HashMap<IpAddr, u16>,
}

/// The registry as shared between the registration listener and senders.
pub type SharedRegistry = Arc<RwLock<ClientRegistry>>;

/// Creates a new empty shared registry.
pub fn new_shared_registry() -> SharedRegistry {
    Arc::new(RwLock::new(ClientRegistry::new()))
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `port` for `addr`, returning the port it replaced, if any.
    ///
    /// IPv4-mapped IPv6 addresses (`::ffff:a.b.c.d`) are stored as plain IPv4
    /// so a dual-stack listener does not create duplicate entries.
    pub fn register(&mut self, addr: IpAddr, port: u16) -> Option<u16> {
        let addr = addr.to_canonical();
        let previous = self.clients.insert(addr, port);
        if let Some(old) = previous.filter(|&old| old != port) {
            debug!("client {addr} moved callback port {old} -> {port}");
        }
        previous
    }

    /// Returns the callback port registered for `addr`.
    pub fn get(&self, addr: IpAddr) -> Option<u16> {
        self.clients.get(&addr.to_canonical()).copied()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Iterates `(address, port)` pairs in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = (IpAddr, u16)> + '_ {
        self.clients.iter().map(|(addr, port)| (*addr, *port))
    }

    /// Returns a snapshot of all entries sorted by address.
    pub fn entries(&self) -> Vec<(IpAddr, u16)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable();
        entries
    }

    /// Returns every client as a connectable socket address, sorted.
    ///
    /// This is what a frame sender iterates to address outgoing data.
    pub fn endpoints(&self) -> Vec<SocketAddr> {
        self.entries()
            .into_iter()
            .map(|(addr, port)| SocketAddr::new(addr, port))
            .collect()
    }
}
