//! # ledtube-core
//!
//! Shared library for LEDTube server discovery containing the two wire
//! codecs and the in-memory client registry.
//!
//! This crate is used by both the server and client applications.
//! It opens no sockets of its own.
//!
//! # Protocol overview
//!
//! A single server on the LAN advertises itself; any number of LED clients
//! find it and tell it where to send frames.
//!
//! ```text
//! server ── UDP multicast [a, b, c, d] ──────────────► clients
//! server ◄── TCP connect, LE callback port, close ─── client
//! ```
//!
//! - **`protocol`** – The discovery datagram (four raw IPv4 octets) and the
//!   registration message (a little-endian unsigned port number).
//! - **`domain`** – The [`ClientRegistry`]: client address to callback port,
//!   last write wins, never expires.

pub mod domain;
pub mod protocol;

pub use domain::registry::{new_shared_registry, ClientRegistry, SharedRegistry};
pub use protocol::announce::{decode_announce, encode_announce, Announce, AnnounceFormat};
pub use protocol::error::ProtocolError;
pub use protocol::registration::{decode_registration_port, encode_registration_port};
