//! Storage infrastructure: configuration file loading.
//!
//! The `config` sub-module reads the server's TOML file and supplies defaults
//! when it does not exist yet.

pub mod config;
