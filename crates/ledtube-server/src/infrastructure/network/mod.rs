//! Network infrastructure for the server.
//!
//! # Sub-modules
//!
//! - **`address`** – Works out which local IPv4 address clients should use to
//!   reach this machine.
//!
//! - **`broadcaster`** – Sends that address to the multicast group on a fixed
//!   interval so clients can find the server without configuration.
//!
//! - **`registration`** – TCP listener where clients report their callback
//!   port; every report lands in the shared `ClientRegistry`.
//!
//! - **`client_manager`** – Starts the broadcaster and the listener together
//!   and owns their shutdown.

pub mod address;
pub mod broadcaster;
pub mod client_manager;
pub mod registration;
