//! TCP registration listener.
//!
//! Clients tell the server where to send them data by connecting to the
//! registration port and writing their callback port (see
//! [`ledtube_core::protocol::registration`]).  For each connection the
//! listener:
//!
//! 1. Reads once, at most 1024 bytes.
//! 2. Decodes the bytes as a little-endian port.
//! 3. Records `registry[peer_ip] = port`.
//! 4. Closes the connection without replying.
//!
//! # Accept modes
//!
//! In [`AcceptMode::Serial`] (the default) each connection is handled to
//! completion before the next `accept`, so a client that connects and then
//! goes quiet holds up everyone else until `read_timeout` expires.
//! [`AcceptMode::Concurrent`] hands every connection to its own task instead.
//!
//! # Failures
//!
//! Errors on one connection (I/O, read timeout, malformed payload) are logged
//! and dropped.  Nothing is recorded for that connection and the accept loop
//! keeps going.  Accept errors are logged the same way.

use std::net::SocketAddr;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use ledtube_core::protocol::{decode_registration_port, ProtocolError, MAX_REGISTRATION_LEN};
use ledtube_core::SharedRegistry;
use serde::Deserialize;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// How long a single `accept` waits before the `running` flag is rechecked.
const ACCEPT_POLL: Duration = Duration::from_millis(200);

/// Error type for the registration listener.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// The TCP listener could not be bound.
    #[error("failed to bind registration listener on {addr}: {source}")]
    BindFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on a client connection.
    #[error("registration I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The client sent nothing within the read timeout.
    #[error("no registration data from {peer} within {after:?}")]
    Timeout { peer: SocketAddr, after: Duration },
    /// The client sent bytes that do not encode a port.
    #[error("malformed registration from {peer}: {source}")]
    Malformed {
        peer: SocketAddr,
        #[source]
        source: ProtocolError,
    },
}

/// How the accept loop treats each connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AcceptMode {
    /// Handle each connection before accepting the next.
    #[default]
    Serial,
    /// Spawn a task per connection.
    Concurrent,
}

/// Settings for the registration listener.
#[derive(Debug, Clone, PartialEq)]
pub struct ListenerConfig {
    /// Address to bind; `0.0.0.0:<SERVER_PORT>` in production.
    pub bind_addr: SocketAddr,
    pub mode: AcceptMode,
    /// Upper bound on waiting for a connected client's single read.
    pub read_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 1337)),
            mode: AcceptMode::Serial,
            read_timeout: Duration::from_secs(5),
        }
    }
}

/// A bound registration listener writing into a shared registry.
pub struct RegistrationListener {
    listener: TcpListener,
    registry: SharedRegistry,
    config: ListenerConfig,
}

impl RegistrationListener {
    /// Binds the TCP listener.
    ///
    /// # Errors
    ///
    /// Returns [`RegistrationError::BindFailed`] if the port is unavailable.
    pub async fn bind(
        config: ListenerConfig,
        registry: SharedRegistry,
    ) -> Result<Self, RegistrationError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| RegistrationError::BindFailed {
                addr: config.bind_addr,
                source,
            })?;
        Ok(Self {
            listener,
            registry,
            config,
        })
    }

    /// The address actually bound (resolves port 0).
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr, RegistrationError> {
        Ok(self.listener.local_addr()?)
    }

    /// Runs the accept loop until `running` is cleared.
    pub async fn run(self, running: Arc<AtomicBool>) {
        let local = self
            .listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".to_string());
        info!(
            "registration server listening on TCP {local} ({:?} mode)",
            self.config.mode
        );

        while running.load(Ordering::Relaxed) {
            let (stream, peer) = match timeout(ACCEPT_POLL, self.listener.accept()).await {
                Ok(Ok(pair)) => pair,
                Ok(Err(e)) => {
                    error!("registration accept error: {e}");
                    continue;
                }
                Err(_) => continue,
            };

            debug!("registration connection from {peer}");
            let registry = Arc::clone(&self.registry);
            let read_timeout = self.config.read_timeout;
            match self.config.mode {
                AcceptMode::Serial => serve_connection(stream, peer, registry, read_timeout).await,
                AcceptMode::Concurrent => {
                    tokio::spawn(serve_connection(stream, peer, registry, read_timeout));
                }
            }
        }

        info!("registration server stopped");
    }
}

/// Binds a [`RegistrationListener`] and spawns its accept loop.
///
/// Returns the bound address together with the loop's handle.
///
/// # Errors
///
/// Returns [`RegistrationError::BindFailed`] if the port is unavailable.
pub async fn start_registration_server(
    config: ListenerConfig,
    registry: SharedRegistry,
    running: Arc<AtomicBool>,
) -> Result<(SocketAddr, JoinHandle<()>), RegistrationError> {
    let listener = RegistrationListener::bind(config, registry).await?;
    let addr = listener.local_addr()?;
    Ok((addr, tokio::spawn(listener.run(running))))
}

/// Handles one connection and logs the outcome.
async fn serve_connection(
    stream: TcpStream,
    peer: SocketAddr,
    registry: SharedRegistry,
    read_timeout: Duration,
) {
    if let Err(e) = handle_connection(stream, peer, &registry, read_timeout).await {
        warn!("registration rejected: {e}");
    }
}

/// Reads one registration from `stream` and records it.
///
/// The stream is closed when this returns, whatever the outcome.
///
/// # Errors
///
/// Returns [`RegistrationError::Timeout`], [`RegistrationError::Io`], or
/// [`RegistrationError::Malformed`]; the registry is untouched in each case.
pub async fn handle_connection(
    mut stream: TcpStream,
    peer: SocketAddr,
    registry: &SharedRegistry,
    read_timeout: Duration,
) -> Result<u16, RegistrationError> {
    let mut buf = [0u8; MAX_REGISTRATION_LEN];
    let len = timeout(read_timeout, stream.read(&mut buf))
        .await
        .map_err(|_| RegistrationError::Timeout {
            peer,
            after: read_timeout,
        })??;

    let port = decode_registration_port(&buf[..len])
        .map_err(|source| RegistrationError::Malformed { peer, source })?;

    let client_ip = peer.ip().to_canonical();
    registry.write().await.register(client_ip, port);
    info!("registered client at {client_ip}:{port}");
    Ok(port)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
