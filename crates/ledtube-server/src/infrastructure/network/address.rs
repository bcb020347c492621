//! Local address resolution.
//!
//! The server advertises the address its outbound traffic would leave from.
//! To find it without enumerating interfaces we "connect" a UDP socket to an
//! address that is almost certainly not on the host.  A UDP connect sends
//! nothing; it only makes the OS pick a route, after which the socket's local
//! address is the one we want.
//!
//! If there is no route at all (cable unplugged, no interfaces up) the
//! resolver falls back to `127.0.0.1` instead of failing.

use std::io;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};

use tracing::warn;

/// Probe target for route selection.  Never contacted.
const PROBE_TARGET: SocketAddrV4 = SocketAddrV4::new(Ipv4Addr::new(10, 255, 255, 255), 1);

/// Source of the IPv4 address the broadcaster advertises.
///
/// The trait exists so tests, and hosts with several interfaces, can pin the
/// advertised address instead of relying on route selection.
pub trait AddressResolver: Send + Sync {
    /// Returns the address to advertise.  Must not fail.
    fn local_ipv4(&self) -> Ipv4Addr;
}

/// Resolves the address from the OS routing table on every call.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemAddressResolver;

impl AddressResolver for SystemAddressResolver {
    fn local_ipv4(&self) -> Ipv4Addr {
        resolve_or_loopback(probe_outbound_ipv4(PROBE_TARGET))
    }
}

/// Always returns the same address (`network.advertise_address`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedAddress(pub Ipv4Addr);

impl AddressResolver for FixedAddress {
    fn local_ipv4(&self) -> Ipv4Addr {
        self.0
    }
}

/// Returns this host's routable IPv4 address as a dotted quad, or
/// `"127.0.0.1"` when no route exists.
pub fn get_local_address() -> String {
    SystemAddressResolver.local_ipv4().to_string()
}

fn resolve_or_loopback(probe: io::Result<Ipv4Addr>) -> Ipv4Addr {
    match probe {
        Ok(addr) => addr,
        Err(e) => {
            warn!("no outbound IPv4 route ({e}); advertising loopback");
            Ipv4Addr::LOCALHOST
        }
    }
}

fn probe_outbound_ipv4(target: SocketAddrV4) -> io::Result<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.connect(target)?;
    local_ipv4_of(socket.local_addr()?)
}

/// Rejects a local address the OS left unspecified.
fn local_ipv4_of(local: SocketAddr) -> io::Result<Ipv4Addr> {
    match local {
        SocketAddr::V4(v4) if !v4.ip().is_unspecified() => Ok(*v4.ip()),
        other => Err(io::Error::new(
            io::ErrorKind::AddrNotAvailable,
            format!("route selection left socket at {other}"),
        )),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
