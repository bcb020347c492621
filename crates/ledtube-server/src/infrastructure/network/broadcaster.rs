//! Periodic multicast announcement of the server address.
//!
//! Every `interval` the broadcaster:
//!
//! 1. Re-resolves the local address (so an interface change is picked up on
//!    the next tick).
//! 2. Encodes it as a discovery datagram (see [`ledtube_core::protocol::announce`]).
//! 3. Sends it to the configured multicast group and port.
//! 4. Sleeps for whatever is left of the interval.
//!
//! The UDP socket is created once in [`Broadcaster::bind`] and owned by the
//! broadcaster; it is closed when the loop returns.
//!
//! # Failures
//!
//! A failed send is logged and the loop carries on with the next tick.
//! Discovery is the only way clients find the server, so a transient network
//! error must not end it.
//!
//! # Stopping
//!
//! The loop runs until the shared `running` flag is cleared.  The sleep is
//! split into short slices so a stop request is seen within ~100 ms.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use ledtube_core::{Announce, AnnounceFormat};
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::address::AddressResolver;

/// How often a sleeping broadcaster checks the `running` flag.
const STOP_POLL: Duration = Duration::from_millis(100);

/// Error type for broadcaster operations.
#[derive(Debug, Error)]
pub enum BroadcastError {
    /// The UDP socket could not be bound.
    #[error("failed to bind broadcast socket: {0}")]
    BindFailed(#[source] std::io::Error),
    /// The announcement interval was zero.
    #[error("broadcast interval must be greater than zero")]
    ZeroInterval,
    /// The multicast TTL could not be applied.
    #[error("failed to set multicast TTL {ttl}: {source}")]
    SetTtl {
        ttl: u32,
        #[source]
        source: std::io::Error,
    },
    /// A datagram could not be sent.
    #[error("failed to send announcement to {target}: {source}")]
    Send {
        target: SocketAddrV4,
        #[source]
        source: std::io::Error,
    },
}

/// Settings for the announcement loop.
#[derive(Debug, Clone, PartialEq)]
pub struct BroadcastConfig {
    /// Multicast group and port the datagram is sent to.
    pub target: SocketAddrV4,
    /// Multicast TTL applied to the socket (`MULTICAST_TTL`).
    pub ttl: u32,
    /// Time between the start of consecutive announcements.
    pub interval: Duration,
    /// Datagram layout.
    pub format: AnnounceFormat,
    /// Registration port, only sent with [`AnnounceFormat::AddressAndPort`].
    pub registration_port: u16,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            target: SocketAddrV4::new(Ipv4Addr::new(224, 1, 1, 1), 5555),
            ttl: 2,
            interval: Duration::from_secs(5),
            format: AnnounceFormat::AddressOnly,
            registration_port: 1337,
        }
    }
}

/// Owns the announcement socket and the address source.
pub struct Broadcaster {
    socket: UdpSocket,
    config: BroadcastConfig,
    resolver: Arc<dyn AddressResolver>,
}

impl Broadcaster {
    /// Creates the announcement socket and applies the multicast TTL.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::ZeroInterval`] for a zero `interval`, or
    /// [`BroadcastError::BindFailed`] / [`BroadcastError::SetTtl`].
    pub async fn bind(
        config: BroadcastConfig,
        resolver: Arc<dyn AddressResolver>,
    ) -> Result<Self, BroadcastError> {
        if config.interval.is_zero() {
            return Err(BroadcastError::ZeroInterval);
        }
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))
            .await
            .map_err(BroadcastError::BindFailed)?;
        socket
            .set_multicast_ttl_v4(config.ttl)
            .map_err(|source| BroadcastError::SetTtl {
                ttl: config.ttl,
                source,
            })?;
        Ok(Self {
            socket,
            config,
            resolver,
        })
    }

    /// Sends a single announcement and returns the advertised address.
    ///
    /// # Errors
    ///
    /// Returns [`BroadcastError::Send`] if the datagram could not be sent.
    pub async fn broadcast_once(&self) -> Result<Ipv4Addr, BroadcastError> {
        let address = self.resolver.local_ipv4();
        let payload = Announce::encode(self.config.format, address, self.config.registration_port);
        self.socket
            .send_to(&payload, self.config.target)
            .await
            .map_err(|source| BroadcastError::Send {
                target: self.config.target,
                source,
            })?;
        Ok(address)
    }

    /// Runs the announcement loop until `running` is cleared.
    ///
    /// Returns the number of announcements that were sent successfully.
    pub async fn run(self, running: Arc<AtomicBool>) -> u64 {
        info!(
            "broadcasting server address to {} every {:?}",
            self.config.target, self.config.interval
        );

        let mut sent = 0u64;
        while running.load(Ordering::Relaxed) {
            let started = Instant::now();

            match self.broadcast_once().await {
                Ok(address) => {
                    sent += 1;
                    debug!(
                        "announced {address} (registration port {}) to {}",
                        self.config.registration_port, self.config.target
                    );
                }
                Err(e) => warn!("{e}"),
            }

            let remaining = self.config.interval.saturating_sub(started.elapsed());
            sleep_while_running(remaining, &running).await;
        }

        info!("broadcaster stopped after {sent} announcement(s)");
        sent
    }
}

/// Binds a [`Broadcaster`] and spawns its loop on the Tokio runtime.
///
/// Returns as soon as the socket is ready; the returned handle resolves to
/// the number of announcements sent once `running` is cleared.
///
/// # Errors
///
/// Returns a [`BroadcastError`] if the socket cannot be set up.
pub async fn start_broadcasting(
    config: BroadcastConfig,
    resolver: Arc<dyn AddressResolver>,
    running: Arc<AtomicBool>,
) -> Result<JoinHandle<u64>, BroadcastError> {
    let broadcaster = Broadcaster::bind(config, resolver).await?;
    Ok(tokio::spawn(broadcaster.run(running)))
}

/// Sleeps for `duration`, returning early once `running` is cleared.
async fn sleep_while_running(duration: Duration, running: &AtomicBool) {
    let deadline = Instant::now() + duration;
    while running.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        sleep(STOP_POLL.min(deadline - now)).await;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::network::address::FixedAddress;

    async fn receiver() -> (UdpSocket, SocketAddrV4) {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.unwrap();
        let port = socket.local_addr().unwrap().port();
        (socket, SocketAddrV4::new(Ipv4Addr::LOCALHOST, port))
    }

    #[test]
    fn test_broadcast_config_default_values() {
        let cfg = BroadcastConfig::default();
        assert_eq!(cfg.target, "224.1.1.1:5555".parse().unwrap());
        assert_eq!(cfg.interval, Duration::from_secs(5));
        assert_eq!(cfg.format, AnnounceFormat::AddressOnly);
    }

    #[tokio::test]
    async fn test_bind_rejects_zero_interval() {
        // Arrange
        let config = BroadcastConfig {
            interval: Duration::ZERO,
            ..BroadcastConfig::default()
        };

        // Act
        let result = Broadcaster::bind(config, Arc::new(FixedAddress(Ipv4Addr::LOCALHOST))).await;

        // Assert
        assert!(matches!(result, Err(BroadcastError::ZeroInterval)));
    }

    #[tokio::test]
    async fn test_broadcast_once_sends_exactly_four_address_bytes() {
        // Arrange
        let (rx, target) = receiver().await;
        let config = BroadcastConfig {
            target,
            ..BroadcastConfig::default()
        };
        let broadcaster =
            Broadcaster::bind(config, Arc::new(FixedAddress(Ipv4Addr::new(192, 168, 1, 42))))
                .await
                .unwrap();

        // Act
        let advertised = broadcaster.broadcast_once().await.unwrap();
        let mut buf = [0u8; 64];
        let (len, _) = rx.recv_from(&mut buf).await.unwrap();

        // Assert
        assert_eq!(advertised, Ipv4Addr::new(192, 168, 1, 42));
        assert_eq!(&buf[..len], &[192, 168, 1, 42]);
    }

    #[tokio::test]
    async fn test_broadcast_once_with_port_format_appends_port() {
        let (rx, target) = receiver().await;
        let config = BroadcastConfig {
            target,
            format: AnnounceFormat::AddressAndPort,
            registration_port: 1337,
            ..BroadcastConfig::default()
        };
        let broadcaster = Broadcaster::bind(config, Arc::new(FixedAddress(Ipv4Addr::new(10, 0, 0, 1))))
            .await
            .unwrap();

        broadcaster.broadcast_once().await.unwrap();
        let mut buf = [0u8; 64];
        let (len, _) = rx.recv_from(&mut buf).await.unwrap();

        assert_eq!(&buf[..len], &[10, 0, 0, 1, 0x39, 0x05]);
    }

    #[tokio::test]
    async fn test_run_returns_promptly_when_stopped_mid_sleep() {
        // Arrange: a long interval so the loop is asleep when we stop it
        let (_rx, target) = receiver().await;
        let config = BroadcastConfig {
            target,
            interval: Duration::from_secs(30),
            ..BroadcastConfig::default()
        };
        let running = Arc::new(AtomicBool::new(true));
        let handle = start_broadcasting(config, Arc::new(FixedAddress(Ipv4Addr::LOCALHOST)), Arc::clone(&running))
            .await
            .unwrap();
        sleep(Duration::from_millis(150)).await;

        // Act
        running.store(false, Ordering::Relaxed);
        let sent = tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("loop must observe the stop flag")
            .unwrap();

        // Assert
        assert_eq!(sent, 1);
    }

    #[tokio::test]
    async fn test_run_with_cleared_flag_sends_nothing() {
        let (_rx, target) = receiver().await;
        let config = BroadcastConfig {
            target,
            ..BroadcastConfig::default()
        };
        let broadcaster = Broadcaster::bind(config, Arc::new(FixedAddress(Ipv4Addr::LOCALHOST)))
            .await
            .unwrap();

        let sent = broadcaster.run(Arc::new(AtomicBool::new(false))).await;

        assert_eq!(sent, 0);
    }

    #[tokio::test]
    async fn test_sleep_while_running_waits_full_duration() {
        let running = AtomicBool::new(true);
        let started = Instant::now();
        sleep_while_running(Duration::from_millis(250), &running).await;
        assert!(started.elapsed() >= Duration::from_millis(250));
    }
}
