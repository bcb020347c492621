//! Network infrastructure for the client application.
//!
//! - **`discovery`** – joins the multicast group and waits for an announcement.
//! - **`registration`** – tells the server which port to send frames to.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use thiserror::Error;

pub mod discovery;
pub mod registration;

/// Errors that can occur in the client network layer.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The multicast port could not be bound.
    #[error("failed to bind discovery socket on UDP {port}: {source}")]
    BindFailed {
        port: u16,
        #[source]
        source: std::io::Error,
    },
    /// The multicast group could not be joined.
    #[error("failed to join multicast group {group}: {source}")]
    JoinFailed {
        group: Ipv4Addr,
        #[source]
        source: std::io::Error,
    },
    /// No decodable announcement arrived in time.
    #[error("no server announcement within {0:?}")]
    DiscoveryTimeout(Duration),
    /// The TCP connection to the server's registration port failed.
    #[error("failed to connect to registration server at {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },
    /// An I/O error occurred on an established socket.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
