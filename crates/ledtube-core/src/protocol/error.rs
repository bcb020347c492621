use thiserror::Error;

/// Errors that can occur while decoding a discovery datagram or a
/// registration message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// A discovery datagram was neither 4 nor 6 bytes long.
    #[error("discovery datagram must be 4 or 6 bytes, got {0}")]
    BadAnnounceLength(usize),

    /// The registration connection closed before any byte arrived.
    #[error("registration payload is empty")]
    EmptyRegistration,

    /// The little-endian value does not fit in a TCP port.
    #[error("registration payload of {len} bytes does not encode a port in 1..=65535")]
    PortOutOfRange { len: usize },

    /// The payload decoded to port 0, which no client can listen on.
    #[error("registration payload encodes port 0")]
    ZeroPort,
}
