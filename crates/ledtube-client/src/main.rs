//! LEDTube reference client — entry point.
//!
//! Finds the server by its multicast announcement (or takes `--server`) and
//! registers this machine's callback port with it.
//!
//! ```text
//! ledtube-client --callback-port 7777
//! ledtube-client --callback-port 7777 --server 192.168.1.10:1337
//! ```

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use ledtube_client::{register, wait_for_announce};

/// LEDTube reference client.
#[derive(Debug, Parser)]
#[command(
    name = "ledtube-client",
    about = "Discovers the LEDTube server and registers a callback port",
    version
)]
struct Cli {
    /// Port this client will receive frames on.
    #[arg(long, env = "LEDTUBE_CALLBACK_PORT")]
    callback_port: u16,

    /// Skip discovery and register with this address directly.
    #[arg(long, env = "LEDTUBE_SERVER")]
    server: Option<SocketAddr>,

    /// Registration port, used when the announcement does not carry one.
    #[arg(long, default_value_t = 1337, env = "LEDTUBE_SERVER_PORT")]
    server_port: u16,

    #[arg(long, default_value = "224.1.1.1", env = "LEDTUBE_MULTICAST_GROUP")]
    multicast_group: Ipv4Addr,

    #[arg(long, default_value_t = 5555, env = "LEDTUBE_MULTICAST_PORT")]
    multicast_port: u16,

    /// Seconds to wait for an announcement.
    #[arg(long, default_value_t = 15)]
    discovery_timeout: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let server = match cli.server {
        Some(addr) => addr,
        None => {
            let announce = wait_for_announce(
                cli.multicast_group,
                cli.multicast_port,
                Duration::from_secs(cli.discovery_timeout),
            )
            .await
            .context("server discovery failed")?;
            let port = announce.port.unwrap_or(cli.server_port);
            SocketAddr::from((announce.address, port))
        }
    };

    info!("registering with server at {server}");
    register(server, cli.callback_port)
        .await
        .with_context(|| format!("registration with {server} failed"))?;
    Ok(())
}
