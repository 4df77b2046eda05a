use crate::utils::validation::validate_bind_address;
use anyhow::{Result, anyhow};
use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt::Display;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0";
pub const DEFAULT_HTTP_PORT: u16 = 8080;
pub const DEFAULT_SOCKS_PORT: u16 = 8085;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    #[serde(skip)]
    pub(crate) path: Option<PathBuf>,
    // Address both listeners bind to
    #[serde(deserialize_with = "bind_address_or_default", default = "default_bind_address")]
    pub(crate) bind_address: String,
    // Port of the HTTP forward proxy / CONNECT tunnel listener
    #[serde(deserialize_with = "http_port_or_default", default = "default_http_port")]
    pub(crate) http_port: u16,
    // Port of the SOCKS5 listener
    #[serde(deserialize_with = "socks_port_or_default", default = "default_socks_port")]
    pub(crate) socks_port: u16,
    #[serde(deserialize_with = "bool_or_true", default = "default_true")]
    pub(crate) socks_enabled: bool,
    // Upper bound for dialing a CONNECT destination; absent means wait indefinitely
    #[serde(deserialize_with = "u64_option_or_default", default, skip_serializing_if = "Option::is_none")]
    pub(crate) connect_timeout_secs: Option<u64>,
}

/// Command line values that take precedence over the configuration file.
/// Only fields that are `Some` are applied.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub http_port: Option<u16>,
    pub socks_port: Option<u16>,
    pub socks_enabled: Option<bool>,
    pub connect_timeout_secs: Option<u64>,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            path: None,
            bind_address: default_bind_address(),
            http_port: DEFAULT_HTTP_PORT,
            socks_port: DEFAULT_SOCKS_PORT,
            socks_enabled: true,
            connect_timeout_secs: None,
        }
    }
}

impl ProxyConfig {
    /// Create a default configuration backed by a file at `path` (with a `.json` extension)
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: Some(path.as_ref().with_extension("json")), ..Self::default() }
    }

    pub fn get_path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }

    pub fn get_bind_address(&self) -> &str {
        &self.bind_address
    }

    pub fn get_http_port(&self) -> u16 {
        self.http_port
    }

    pub fn get_socks_port(&self) -> u16 {
        self.socks_port
    }

    pub fn is_socks_enabled(&self) -> bool {
        self.socks_enabled
    }

    pub fn get_connect_timeout(&self) -> Option<Duration> {
        self.connect_timeout_secs.filter(|secs| *secs > 0).map(Duration::from_secs)
    }

    pub fn http_addr(&self) -> Result<SocketAddr> {
        let ip = validate_bind_address(&self.bind_address).map_err(|e| anyhow!(e))?;
        Ok(SocketAddr::new(ip, self.http_port))
    }

    pub fn socks_addr(&self) -> Result<SocketAddr> {
        let ip = validate_bind_address(&self.bind_address).map_err(|e| anyhow!(e))?;
        Ok(SocketAddr::new(ip, self.socks_port))
    }

    /// Apply command line overrides on top of the loaded values
    pub fn apply(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.bind_address = bind_address;
        }
        if let Some(port) = overrides.http_port {
            self.http_port = port;
        }
        if let Some(port) = overrides.socks_port {
            self.socks_port = port;
        }
        if let Some(enabled) = overrides.socks_enabled {
            self.socks_enabled = enabled;
        }
        if let Some(secs) = overrides.connect_timeout_secs {
            // Treat 0 as "unset"
            self.connect_timeout_secs = if secs == 0 { None } else { Some(secs) };
        }
    }
}

impl Display for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let json = serde_json::to_string_pretty(self).map_err(|_| std::fmt::Error)?;
        writeln!(f, "{}", json)
    }
}

// Helper functions for deserialization
fn bind_address_or_default<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match String::deserialize(deserializer) {
        Ok(s) => Ok(s),
        Err(e) => {
            warn!("Failed to deserialize bind address: {}, using {}", e, DEFAULT_BIND_ADDRESS);
            Ok(default_bind_address())
        }
    }
}

fn u16_or<'de, D>(deserializer: D, fallback: u16) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    match u16::deserialize(deserializer) {
        Ok(n) => Ok(n),
        Err(e) => {
            warn!("Failed to deserialize u16 value: {}, using {}", e, fallback);
            Ok(fallback)
        }
    }
}

fn http_port_or_default<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    u16_or(deserializer, DEFAULT_HTTP_PORT)
}

fn socks_port_or_default<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    u16_or(deserializer, DEFAULT_SOCKS_PORT)
}

// Forgiving bool: non-bool types fall back to true.
fn bool_or_true<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match bool::deserialize(deserializer) {
        Ok(b) => Ok(b),
        Err(e) => {
            warn!("Failed to deserialize bool value: {}, using true", e);
            Ok(true)
        }
    }
}

fn u64_option_or_default<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<u64>::deserialize(deserializer) {
        Ok(Some(n)) if n > 0 => Ok(Some(n)),
        Ok(_) => Ok(None),
        Err(e) => {
            warn!("Failed to deserialize u64 option value: {}, using default None", e);
            Ok(None)
        }
    }
}

fn default_bind_address() -> String {
    DEFAULT_BIND_ADDRESS.to_string()
}

fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

fn default_socks_port() -> u16 {
    DEFAULT_SOCKS_PORT
}

fn default_true() -> bool {
    true
}
