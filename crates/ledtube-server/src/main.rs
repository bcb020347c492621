//! LEDTube discovery server — entry point.
//!
//! Announces this machine's address on the LAN and records the callback port
//! of every LED client that registers.
//!
//! # Usage
//!
//! ```text
//! ledtube-server [OPTIONS]
//!
//! Options:
//!   --config <PATH>              TOML config file [default: platform config dir]
//!   --server-port <PORT>         TCP registration port
//!   --multicast-group <IP>       Multicast group for announcements
//!   --multicast-port <PORT>      Multicast port for announcements
//!   --advertise-address <IP>     Advertise this address instead of probing
//!   --accept-mode <MODE>         serial | concurrent
//! ```
//!
//! Command-line values override the config file.  `RUST_LOG` overrides the
//! configured log level.
//!
//! # Architecture
//!
//! ```text
//! main()
//!  └─ load_config()            -- TOML file + CLI overrides
//!  └─ ClientManager::start()
//!       ├─ Broadcaster          (UDP multicast task)
//!       └─ RegistrationListener (TCP accept task)
//! ```

use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::sync::{atomic::Ordering, Arc};

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledtube_core::new_shared_registry;
use ledtube_server::infrastructure::network::address::{
    AddressResolver, FixedAddress, SystemAddressResolver,
};
use ledtube_server::infrastructure::network::registration::AcceptMode;
use ledtube_server::infrastructure::storage::config::{config_file_path, load_config, ServerConfig};
use ledtube_server::ClientManager;

// ── CLI argument definitions ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliAcceptMode {
    Serial,
    Concurrent,
}

impl From<CliAcceptMode> for AcceptMode {
    fn from(mode: CliAcceptMode) -> Self {
        match mode {
            CliAcceptMode::Serial => AcceptMode::Serial,
            CliAcceptMode::Concurrent => AcceptMode::Concurrent,
        }
    }
}

/// LEDTube discovery server.
#[derive(Debug, Parser)]
#[command(
    name = "ledtube-server",
    about = "Announces the server on the LAN and accepts LED client registrations",
    version
)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, env = "LEDTUBE_CONFIG")]
    config: Option<PathBuf>,

    /// TCP port clients register on.
    #[arg(long, env = "LEDTUBE_SERVER_PORT")]
    server_port: Option<u16>,

    /// Multicast group the server address is announced to.
    #[arg(long, env = "LEDTUBE_MULTICAST_GROUP")]
    multicast_group: Option<Ipv4Addr>,

    /// UDP port of the multicast announcements.
    #[arg(long, env = "LEDTUBE_MULTICAST_PORT")]
    multicast_port: Option<u16>,

    /// Address to announce instead of the route-selected one.
    #[arg(long, env = "LEDTUBE_ADVERTISE_ADDRESS")]
    advertise_address: Option<Ipv4Addr>,

    /// Whether registrations are handled one at a time or in parallel.
    #[arg(long, value_enum)]
    accept_mode: Option<CliAcceptMode>,
}

impl Cli {
    /// Loads the config file and applies command-line overrides.
    fn into_server_config(self) -> anyhow::Result<ServerConfig> {
        let path = match self.config {
            Some(path) => path,
            None => config_file_path().context("no --config given and no platform config dir")?,
        };
        let mut cfg =
            load_config(&path).with_context(|| format!("failed to load {}", path.display()))?;

        if let Some(port) = self.server_port {
            cfg.network.server_port = port;
        }
        if let Some(group) = self.multicast_group {
            cfg.network.multicast_group = group;
        }
        if let Some(port) = self.multicast_port {
            cfg.network.multicast_port = port;
        }
        if let Some(addr) = self.advertise_address {
            cfg.network.advertise_address = Some(addr);
        }
        if let Some(mode) = self.accept_mode {
            cfg.registration.accept_mode = mode.into();
        }

        cfg.validate().context("invalid configuration after overrides")?;
        Ok(cfg)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Cli::parse().into_server_config()?;

    // Level is overridden by `RUST_LOG`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&cfg.logging.log_level)),
        )
        .init();

    info!("LEDTube server starting");

    let resolver: Arc<dyn AddressResolver> = match cfg.network.advertise_address {
        Some(addr) => Arc::new(FixedAddress(addr)),
        None => Arc::new(SystemAddressResolver),
    };
    info!("advertising {}", resolver.local_ipv4());

    let registry = new_shared_registry();
    let manager =
        ClientManager::start_with_resolver(Arc::clone(&registry), cfg.manager_settings(), resolver)
            .await?;

    // ── Ctrl-C / SIGTERM handler ──────────────────────────────────────────────
    let running = manager.running_flag();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            running.store(false, Ordering::Relaxed);
        }
    });

    info!("LEDTube server ready.  Press Ctrl-C to exit.");
    let sent = manager.join().await;

    let registry = registry.read().await;
    info!(
        "LEDTube server stopped after {sent} announcement(s); {} client(s) registered",
        registry.len()
    );
    for (addr, port) in registry.entries() {
        info!("  {addr}:{port}");
    }
    Ok(())
}
