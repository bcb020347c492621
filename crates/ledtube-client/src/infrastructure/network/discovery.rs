//! Listening for the server's discovery datagram.

use std::net::Ipv4Addr;
use std::time::Duration;

use ledtube_core::{decode_announce, Announce};
use tokio::net::UdpSocket;
use tokio::time::{timeout, Instant};
use tracing::{debug, info};

use super::ClientError;

/// Binds `port`, joins `group`, and returns the first valid announcement.
///
/// # Errors
///
/// Returns [`ClientError::BindFailed`], [`ClientError::JoinFailed`], or
/// [`ClientError::DiscoveryTimeout`].
pub async fn wait_for_announce(
    group: Ipv4Addr,
    port: u16,
    wait: Duration,
) -> Result<Announce, ClientError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))
        .await
        .map_err(|source| ClientError::BindFailed { port, source })?;
    socket
        .join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)
        .map_err(|source| ClientError::JoinFailed { group, source })?;
    info!("waiting for server announcement on {group}:{port}");
    wait_for_announce_on(&socket, wait).await
}

/// Waits on an already bound socket for the first datagram that decodes.
///
/// Datagrams of the wrong length are logged and skipped.
///
/// # Errors
///
/// Returns [`ClientError::DiscoveryTimeout`] once `wait` has elapsed, or
/// [`ClientError::Io`] if the receive itself fails.
pub async fn wait_for_announce_on(
    socket: &UdpSocket,
    wait: Duration,
) -> Result<Announce, ClientError> {
    let deadline = Instant::now() + wait;
    let mut buf = [0u8; 64];

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let (len, src) = timeout(remaining, socket.recv_from(&mut buf))
            .await
            .map_err(|_| ClientError::DiscoveryTimeout(wait))??;

        match decode_announce(&buf[..len]) {
            Ok(announce) => {
                debug!("announcement from {src}: {}", announce.address);
                return Ok(announce);
            }
            Err(e) => debug!("ignoring datagram from {src}: {e}"),
        }
    }
}
