//! Configuration for the Myolink daemon
//!
//! Provides configuration file handling and validation.
//! Configuration is organized into logical sections:
//! - Device settings (baud rate, timeouts, retry policy)
//! - Server settings (bind address, WebSocket path)
//!
//! Settings load from a JSON file; every field has a default so a
//! partial file (or no file at all) yields a working configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serial device settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Baud rate for the serial link
    pub baud_rate: u32,
    /// Read timeout on the serial link in milliseconds
    pub read_timeout_ms: u64,
    /// Idle sleep between read polls in milliseconds
    pub poll_interval_ms: u64,
    /// Delay before retrying after a connection failure, in milliseconds
    pub connect_retry_delay_ms: u64,
    /// Delay before retrying when no port is visible, in milliseconds
    pub resolve_retry_delay_ms: u64,
    /// Consecutive connection failures before forcing port re-resolution
    pub max_consecutive_failures: u32,
    /// Settle time after forcibly reclaiming a busy port, in milliseconds
    pub reclaim_settle_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            baud_rate: 115200,
            read_timeout_ms: 1000,
            poll_interval_ms: 10,
            connect_retry_delay_ms: 5000,
            resolve_retry_delay_ms: 2000,
            max_consecutive_failures: 3,
            reclaim_settle_ms: 500,
        }
    }
}

/// Subscriber endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Address the WebSocket listener binds to
    pub bind_addr: String,
    /// Request path that upgrades to the event stream
    pub ws_path: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            ws_path: "/ws".to_string(),
        }
    }
}

/// Top-level daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Serial device section
    pub device: DeviceSettings,
    /// Subscriber endpoint section
    pub server: ServerSettings,
}

impl BridgeConfig {
    /// Load configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::LoadError(format!("{}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&contents)?;
        config.validate()?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Check that all settings are usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.baud_rate == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "device.baud_rate".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.device.max_consecutive_failures == 0 {
            return Err(ConfigError::InvalidSetting {
                key: "device.max_consecutive_failures".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.server.bind_addr.is_empty() {
            return Err(ConfigError::InvalidSetting {
                key: "server.bind_addr".to_string(),
                reason: "must not be empty".to_string(),
            });
        }
        if !self.server.ws_path.starts_with('/') {
            return Err(ConfigError::InvalidSetting {
                key: "server.ws_path".to_string(),
                reason: "must start with '/'".to_string(),
            });
        }
        Ok(())
    }
}
