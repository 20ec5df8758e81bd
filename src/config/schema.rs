//! Configuration schema for ihpp
//!
//! Configuration is stored at `~/.config/ihpp/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Inspector server endpoints
    pub server: ServerConfig,

    /// Response cache settings
    pub cache: CacheConfig,

    /// Live-update connection settings
    pub live: LiveConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Enable verbose logging
    pub verbose: bool,

    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            log_format: "text".to_string(),
        }
    }
}

/// Inspector server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Base URL of the inspector API
    pub api_url: String,

    /// Path of the live-update WebSocket endpoint
    pub ws_path: String,

    /// Timeout for a relayed request, in seconds
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:20000".to_string(),
            ws_path: "/api/ws".to_string(),
            request_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Response cache configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// SQLite database path (default: `<state_dir>/responses.db`)
    pub store_path: Option<PathBuf>,
}

/// Live-update configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    /// Delay before reconnecting after a close, in milliseconds
    pub reconnect_delay_ms: u64,

    /// Keepalive ping period in seconds (0 = disabled)
    pub ping_interval_secs: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: 1000,
            ping_interval_secs: 30,
        }
    }
}

impl LiveConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_secs > 0).then(|| Duration::from_secs(self.ping_interval_secs))
    }
}
