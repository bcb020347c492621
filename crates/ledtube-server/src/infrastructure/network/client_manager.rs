//! ClientManager: starts the broadcaster and the registration listener
//! against one shared registry.
//!
//! ```text
//! ClientManager::start()
//!  ├─ Broadcaster           (Tokio task, UDP multicast every 5 s)
//!  └─ RegistrationListener  (Tokio task, TCP accept loop)
//!        └─ writes SharedRegistry ◄── read by frame senders
//! ```
//!
//! Both activities share a single `running` flag.  If nobody calls
//! [`ClientManager::stop`] they run until the process exits.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use anyhow::Context;
use ledtube_core::SharedRegistry;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::address::{AddressResolver, SystemAddressResolver};
use super::broadcaster::{start_broadcasting, BroadcastConfig};
use super::registration::{start_registration_server, ListenerConfig};

/// Everything needed to start both activities.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ManagerSettings {
    pub broadcast: BroadcastConfig,
    pub listener: ListenerConfig,
}

impl ManagerSettings {
    /// Settings for the given registration port and multicast group, with
    /// default TTL, interval, and accept mode.
    pub fn new(registration_port: u16, multicast_group: Ipv4Addr, multicast_port: u16) -> Self {
        Self {
            broadcast: BroadcastConfig {
                target: SocketAddrV4::new(multicast_group, multicast_port),
                registration_port,
                ..BroadcastConfig::default()
            },
            listener: ListenerConfig {
                bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, registration_port)),
                ..ListenerConfig::default()
            },
        }
    }
}

/// Handle to the running discovery subsystem.
pub struct ClientManager {
    registry: SharedRegistry,
    registration_addr: SocketAddr,
    running: Arc<AtomicBool>,
    broadcaster: JoinHandle<u64>,
    listener: JoinHandle<()>,
}

impl ClientManager {
    /// Starts both activities, advertising the route-selected local address.
    ///
    /// # Errors
    ///
    /// Fails if either socket cannot be bound; nothing is left running.
    pub async fn start(registry: SharedRegistry, settings: ManagerSettings) -> anyhow::Result<Self> {
        Self::start_with_resolver(registry, settings, Arc::new(SystemAddressResolver)).await
    }

    /// Starts both activities with an explicit address source.
    ///
    /// # Errors
    ///
    /// Fails if either socket cannot be bound; nothing is left running.
    pub async fn start_with_resolver(
        registry: SharedRegistry,
        settings: ManagerSettings,
        resolver: Arc<dyn AddressResolver>,
    ) -> anyhow::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let mut broadcast = settings.broadcast;
        let target = broadcast.target;

        let (registration_addr, listener) = start_registration_server(
            settings.listener,
            Arc::clone(&registry),
            Arc::clone(&running),
        )
        .await
        .context("failed to start registration server")?;

        // Announce the port the listener actually holds (port 0 binds pick one).
        broadcast.registration_port = registration_addr.port();

        let broadcaster =
            match start_broadcasting(broadcast, resolver, Arc::clone(&running)).await {
                Ok(handle) => handle,
                Err(e) => {
                    running.store(false, Ordering::Relaxed);
                    listener.abort();
                    return Err(e)
                        .with_context(|| format!("failed to start broadcaster for {target}"));
                }
            };

        info!("client manager started (registration on {registration_addr}, announcing to {target})");
        Ok(Self {
            registry,
            registration_addr,
            running,
            broadcaster,
            listener,
        })
    }

    /// The bound registration address (useful when configured with port 0).
    pub fn registration_addr(&self) -> SocketAddr {
        self.registration_addr
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// A clone of the stop flag, e.g. for a signal handler.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Asks both loops to stop.  Returns immediately.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    /// Waits for both loops to finish.  Returns the announcement count.
    pub async fn join(self) -> u64 {
        if let Err(e) = self.listener.await {
            warn!("registration task ended abnormally: {e}");
        }
        match self.broadcaster.await {
            Ok(sent) => sent,
            Err(e) => {
                warn!("broadcaster task ended abnormally: {e}");
                0
            }
        }
    }

    /// `stop` followed by `join`.
    pub async fn shutdown(self) -> u64 {
        self.stop();
        self.join().await
    }
}
