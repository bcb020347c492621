//! The server discovery datagram.
//!
//! The server periodically sends its own IPv4 address to the multicast group
//! as four raw bytes, most-significant octet first:
//!
//! ```text
//! 192.168.1.42  ──►  [0xC0, 0xA8, 0x01, 0x2A]
//! ```
//!
//! There is no length prefix, version, or checksum.  The datagram does not
//! carry the registration port, so clients must learn it out-of-band.
//! [`AnnounceFormat::AddressAndPort`] opts into a 6-byte variant that appends
//! the port as two little-endian bytes; clients that only read four bytes
//! still see the address.

use std::net::Ipv4Addr;

use super::error::ProtocolError;

/// Length of the address-only datagram.
pub const ANNOUNCE_LEN: usize = 4;

/// Length of the datagram carrying the registration port.
pub const ANNOUNCE_WITH_PORT_LEN: usize = 6;

/// Which datagram layout the broadcaster emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnnounceFormat {
    /// Four address bytes only.
    #[default]
    AddressOnly,
    /// Four address bytes followed by the registration port, little-endian.
    AddressAndPort,
}

/// A decoded discovery datagram.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Announce {
    /// The server's advertised IPv4 address.
    pub address: Ipv4Addr,
    /// The registration port, present only in the 6-byte layout.
    pub port: Option<u16>,
}

impl Announce {
    /// Encodes the announcement in the given layout.
    ///
    /// `registration_port` is ignored for [`AnnounceFormat::AddressOnly`].
    pub fn encode(format: AnnounceFormat, address: Ipv4Addr, registration_port: u16) -> Vec<u8> {
        match format {
            AnnounceFormat::AddressOnly => encode_announce(address).to_vec(),
            AnnounceFormat::AddressAndPort => {
                encode_announce_with_port(address, registration_port).to_vec()
            }
        }
    }
}

/// Encodes `address` as the 4-byte discovery payload.
///
/// # Examples
///
/// ```rust
/// use std::net::Ipv4Addr;
/// use ledtube_core::encode_announce;
///
/// assert_eq!(encode_announce(Ipv4Addr::new(192, 168, 1, 42)), [192, 168, 1, 42]);
/// ```
pub fn encode_announce(address: Ipv4Addr) -> [u8; ANNOUNCE_LEN] {
    address.octets()
}

/// Encodes `address` followed by `port` (little-endian).
pub fn encode_announce_with_port(address: Ipv4Addr, port: u16) -> [u8; ANNOUNCE_WITH_PORT_LEN] {
    let [a, b, c, d] = address.octets();
    let [lo, hi] = port.to_le_bytes();
    [a, b, c, d, lo, hi]
}

/// Decodes a discovery datagram.
///
/// # Errors
///
/// Returns [`ProtocolError::BadAnnounceLength`] unless `datagram` is exactly
/// 4 or 6 bytes long.
pub fn decode_announce(datagram: &[u8]) -> Result<Announce, ProtocolError> {
    match *datagram {
        [a, b, c, d] => Ok(Announce {
            address: Ipv4Addr::new(a, b, c, d),
            port: None,
        }),
        [a, b, c, d, lo, hi] => Ok(Announce {
            address: Ipv4Addr::new(a, b, c, d),
            port: Some(u16::from_le_bytes([lo, hi])),
        }),
        _ => Err(ProtocolError::BadAnnounceLength(datagram.len())),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_announce_is_four_octets_msb_first() {
        // Arrange
        let addr = Ipv4Addr::new(192, 168, 1, 42);

        // Act
        let bytes = encode_announce(addr);

        // Assert
        assert_eq!(bytes, [192, 168, 1, 42]);
    }

    #[test]
    fn test_encode_announce_has_no_trailing_bytes() {
        let bytes = Announce::encode(AnnounceFormat::AddressOnly, Ipv4Addr::new(10, 0, 0, 7), 1337);
        assert_eq!(bytes, vec![10, 0, 0, 7]);
    }

    #[test]
    fn test_encode_announce_with_port_appends_little_endian_port() {
        // 1337 = 0x0539
        let bytes = encode_announce_with_port(Ipv4Addr::new(10, 0, 0, 7), 1337);
        assert_eq!(bytes, [10, 0, 0, 7, 0x39, 0x05]);
    }

    #[test]
    fn test_decode_announce_address_only() {
        let announce = decode_announce(&[172, 16, 4, 1]).unwrap();
        assert_eq!(announce.address, Ipv4Addr::new(172, 16, 4, 1));
        assert_eq!(announce.port, None);
    }

    #[test]
    fn test_decode_announce_with_port() {
        let announce = decode_announce(&[172, 16, 4, 1, 0x39, 0x05]).unwrap();
        assert_eq!(announce.port, Some(1337));
    }

    #[test]
    fn test_decode_announce_rejects_other_lengths() {
        assert_eq!(decode_announce(&[]), Err(ProtocolError::BadAnnounceLength(0)));
        assert_eq!(decode_announce(&[1, 2, 3]), Err(ProtocolError::BadAnnounceLength(3)));
        assert_eq!(
            decode_announce(&[1, 2, 3, 4, 5]),
            Err(ProtocolError::BadAnnounceLength(5))
        );
    }

    #[test]
    fn test_default_format_is_address_only() {
        assert_eq!(AnnounceFormat::default(), AnnounceFormat::AddressOnly);
    }
}
