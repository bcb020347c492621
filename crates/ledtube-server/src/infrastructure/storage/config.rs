//! TOML-based configuration for the server.
//!
//! Read from the path given on the command line, or from the
//! platform-appropriate default:
//! - Windows:  `%APPDATA%\LEDTube\server.toml`
//! - Linux:    `~/.config/ledtube/server.toml`
//! - macOS:    `~/Library/Application Support/LEDTube/server.toml`
//!
//! ```toml
//! [network]
//! server_port = 1337
//! multicast_group = "224.1.1.1"
//! multicast_port = 5555
//! multicast_ttl = 2
//!
//! [registration]
//! accept_mode = "serial"
//! ```
//!
//! Every field has a `#[serde(default = "...")]` so a missing file, a missing
//! section, or a missing key all fall back to the values shown above.

use std::net::{IpAddr, Ipv4Addr, SocketAddr, SocketAddrV4};
use std::path::{Path, PathBuf};
use std::time::Duration;

use ledtube_core::AnnounceFormat;
use serde::Deserialize;
use thiserror::Error;

use crate::infrastructure::network::broadcaster::BroadcastConfig;
use crate::infrastructure::network::client_manager::ManagerSettings;
use crate::infrastructure::network::registration::{AcceptMode, ListenerConfig};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but cannot be used.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
pub struct ServerConfig {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub registration: RegistrationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Ports, multicast group, and announcement settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// TCP registration port (`SERVER_PORT`).
    #[serde(default = "default_server_port")]
    pub server_port: u16,
    /// Interface the registration listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    #[serde(default = "default_multicast_group")]
    pub multicast_group: Ipv4Addr,
    #[serde(default = "default_multicast_port")]
    pub multicast_port: u16,
    /// `MULTICAST_TTL`.
    #[serde(default = "default_multicast_ttl")]
    pub multicast_ttl: u32,
    #[serde(default = "default_broadcast_interval_secs")]
    pub broadcast_interval_secs: u64,
    /// Append the registration port to the discovery datagram.
    #[serde(default)]
    pub include_port_in_announce: bool,
    /// Advertise this address instead of the route-selected one.
    #[serde(default)]
    pub advertise_address: Option<Ipv4Addr>,
}

/// Registration listener behaviour.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct RegistrationConfig {
    #[serde(default)]
    pub accept_mode: AcceptMode,
    /// How long a connected client may take to send its port.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_server_port() -> u16 {
    1337
}
fn default_bind_address() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}
fn default_multicast_group() -> Ipv4Addr {
    Ipv4Addr::new(224, 1, 1, 1)
}
fn default_multicast_port() -> u16 {
    5555
}
fn default_multicast_ttl() -> u32 {
    2
}
fn default_broadcast_interval_secs() -> u64 {
    5
}
fn default_read_timeout_ms() -> u64 {
    5000
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            server_port: default_server_port(),
            bind_address: default_bind_address(),
            multicast_group: default_multicast_group(),
            multicast_port: default_multicast_port(),
            multicast_ttl: default_multicast_ttl(),
            broadcast_interval_secs: default_broadcast_interval_secs(),
            include_port_in_announce: false,
            advertise_address: None,
        }
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            accept_mode: AcceptMode::default(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ServerConfig {
    /// Checks values serde cannot reject on its own.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for a non-multicast group, a zero TTL,
    /// a zero broadcast interval, or a zero read timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let net = &self.network;
        if !net.multicast_group.is_multicast() {
            return Err(ConfigError::Invalid(format!(
                "multicast_group {} is not in 224.0.0.0/4",
                net.multicast_group
            )));
        }
        if net.multicast_ttl == 0 || net.multicast_ttl > 255 {
            return Err(ConfigError::Invalid(format!(
                "multicast_ttl must be 1..=255, got {}",
                net.multicast_ttl
            )));
        }
        if net.broadcast_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "broadcast_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.registration.read_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "read_timeout_ms must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Converts the file schema into runtime settings.
    pub fn manager_settings(&self) -> ManagerSettings {
        let net = &self.network;
        let format = if net.include_port_in_announce {
            AnnounceFormat::AddressAndPort
        } else {
            AnnounceFormat::AddressOnly
        };
        ManagerSettings {
            broadcast: BroadcastConfig {
                target: SocketAddrV4::new(net.multicast_group, net.multicast_port),
                ttl: net.multicast_ttl,
                interval: Duration::from_secs(net.broadcast_interval_secs),
                format,
                registration_port: net.server_port,
            },
            listener: ListenerConfig {
                bind_addr: SocketAddr::new(net.bind_address, net.server_port),
                mode: self.registration.accept_mode,
                read_timeout: Duration::from_millis(self.registration.read_timeout_ms),
            },
        }
    }
}

// ── Config loading ────────────────────────────────────────────────────────────

/// Resolves the default config file path.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] if the base directory cannot be
/// determined.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    platform_config_dir()
        .map(|dir| dir.join("server.toml"))
        .ok_or(ConfigError::NoPlatformConfigDir)
}

/// Loads and validates `ServerConfig` from `path`, returning defaults if the
/// file does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// [`ConfigError::Parse`] for malformed TOML, and [`ConfigError::Invalid`]
/// from [`ServerConfig::validate`].
pub fn load_config(path: &Path) -> Result<ServerConfig, ConfigError> {
    let cfg = match std::fs::read_to_string(path) {
        Ok(content) => toml::from_str::<ServerConfig>(&content)?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => ServerConfig::default(),
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    cfg.validate()?;
    Ok(cfg)
}

fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("LEDTube"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("ledtube"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("LEDTube")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
