//! The client registration message.
//!
//! A client connects to the server's registration port, writes its callback
//! port as an unsigned little-endian integer, and the server closes the
//! connection.  Nothing is sent back.
//!
//! The server performs a single read of at most [`MAX_REGISTRATION_LEN`]
//! bytes; there is no framing.  Any width works as long as the magnitude is a
//! valid port, so the 2-byte and 4-byte encodings of `5005` are equivalent:
//!
//! ```text
//! [0x8D, 0x13]             ──►  5005
//! [0x8D, 0x13, 0x00, 0x00] ──►  5005
//! ```

use super::error::ProtocolError;

/// Upper bound on the bytes read from one registration connection.
pub const MAX_REGISTRATION_LEN: usize = 1024;

/// Encodes `port` as the 4-byte little-endian registration payload.
pub fn encode_registration_port(port: u16) -> [u8; 4] {
    u32::from(port).to_le_bytes()
}

/// Decodes a registration payload into a callback port.
///
/// # Errors
///
/// - [`ProtocolError::EmptyRegistration`] if `payload` is empty.
/// - [`ProtocolError::PortOutOfRange`] if the little-endian magnitude exceeds
///   `u16::MAX`, which includes any non-zero byte past the second.
/// - [`ProtocolError::ZeroPort`] if the magnitude is zero.
pub fn decode_registration_port(payload: &[u8]) -> Result<u16, ProtocolError> {
    let (low, high) = match payload {
        [] => return Err(ProtocolError::EmptyRegistration),
        [lo] => (u16::from(*lo), &[][..]),
        [lo, hi, rest @ ..] => (u16::from_le_bytes([*lo, *hi]), rest),
    };

    if high.iter().any(|&b| b != 0) {
        return Err(ProtocolError::PortOutOfRange { len: payload.len() });
    }
    if low == 0 {
        return Err(ProtocolError::ZeroPort);
    }
    Ok(low)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
