//! Application configuration.
//!
//! A TOML file with `serde(default)` semantics: partial files work and
//! missing fields fall back to the defaults below. The native runtime port
//! can also arrive through the `RUSTADDR` environment variable, which the
//! runtime spawner sets.

use std::net::SocketAddr;
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(std::path::PathBuf),

    #[error("config parse error: {0}")]
    Parse(String),

    #[error("native runtime port not configured (set runtime_port or RUSTADDR)")]
    MissingRuntimePort,

    #[error("invalid RUSTADDR value: {0}")]
    InvalidRuntimePort(String),
}

/// Application settings. Only override what you want to change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Host the frontend WebSocket endpoint binds to.
    pub host: String,
    /// Port of the frontend WebSocket endpoint.
    pub port: u16,
    /// TCP port of the native windowing runtime on localhost.
    pub runtime_port: Option<u16>,
    /// Per-call timeout in seconds.
    pub call_timeout_secs: u64,
    /// Pause between relay iterations in milliseconds.
    pub relay_interval_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8765,
            runtime_port: None,
            call_timeout_secs: 10,
            relay_interval_ms: 10,
        }
    }
}

impl AppConfig {
    /// Load from a TOML file, or the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.to_path_buf()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// The native runtime address: configured port first, then `RUSTADDR`.
    pub fn runtime_addr(&self) -> Result<SocketAddr, ConfigError> {
        let port = match self.runtime_port {
            Some(port) => port,
            None => match std::env::var("RUSTADDR") {
                Ok(raw) => raw
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidRuntimePort(raw))?,
                Err(_) => return Err(ConfigError::MissingRuntimePort),
            },
        };
        Ok(SocketAddr::from(([127, 0, 0, 1], port)))
    }
}
