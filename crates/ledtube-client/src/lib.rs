//! ledtube-client library entry point.
//!
//! The client half of LEDTube discovery: wait for the server's multicast
//! announcement, then register a callback port with it.

pub mod infrastructure;

pub use infrastructure::network::discovery::{wait_for_announce, wait_for_announce_on};
pub use infrastructure::network::registration::register;
pub use infrastructure::network::ClientError;
