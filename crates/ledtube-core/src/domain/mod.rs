//! Domain entities for LEDTube discovery.
//!
//! Nothing here touches a socket; the registry is plain data behind a lock.

/// Client address to callback port mapping.
///
/// See [`registry::ClientRegistry`] for the main type.
pub mod registry;
