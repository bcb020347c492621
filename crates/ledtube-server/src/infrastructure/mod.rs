//! Infrastructure layer for the server.
//!
//! Contains the OS-facing adapters: the UDP announcer, the TCP registration
//! listener, address resolution, and TOML configuration storage.

pub mod network;
pub mod storage;
