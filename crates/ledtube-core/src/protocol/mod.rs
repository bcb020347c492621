//! Wire formats for discovery and registration.

pub mod announce;
pub mod error;
pub mod registration;

pub use announce::{
    decode_announce, encode_announce, encode_announce_with_port, Announce, AnnounceFormat,
};
pub use error::ProtocolError;
pub use registration::{decode_registration_port, encode_registration_port, MAX_REGISTRATION_LEN};
