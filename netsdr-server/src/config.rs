//! Server configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via NETSDR_CONFIG)
//! 3. Environment variables

use netsdr_protocol::{MessageType, DEFAULT_DATA_PORT, MAX_DATA_ITEM_LENGTH};
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Echo server port used by the test bench.
pub const DEFAULT_ECHO_PORT: u16 = 5000;

/// Largest sample body the sender may put in one block.
pub const MAX_BLOCK_SIZE: usize = MAX_DATA_ITEM_LENGTH - 4;

/// Server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Echo server configuration.
    pub network: NetworkConfig,
    /// UDP sender configuration.
    pub sender: SenderConfig,
}

impl Config {
    /// Loads configuration from file, then applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("NETSDR_CONFIG") {
            config = Self::read_file(&path)?;
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads and validates configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::read_file(path)?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Loads configuration from environment variables only.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        self.network.apply_env_overrides();
        self.sender.apply_env_overrides();
    }

    /// Checks values that deserialize fine but cannot be used.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;
        self.sender.validate()
    }

    /// Saves configuration to a YAML file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = serde_yaml::to_string(self)
            .map_err(|e| ConfigError::ParseError(path.to_path_buf(), e.to_string()))?;
        std::fs::write(path, content).map_err(|e| ConfigError::IoError(path.to_path_buf(), e))?;
        Ok(())
    }
}

/// Echo server network configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind to.
    #[serde(with = "socket_addr_serde")]
    pub bind_addr: SocketAddr,
    /// Idle connection timeout in seconds.
    pub idle_timeout_secs: u64,
    /// Maximum concurrent connections.
    pub max_connections: usize,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_ECHO_PORT)),
            idle_timeout_secs: 300,
            max_connections: 100,
        }
    }
}

impl NetworkConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("NETSDR_BIND") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }

        if let Ok(timeout) = std::env::var("NETSDR_IDLE_TIMEOUT") {
            if let Ok(secs) = timeout.parse() {
                self.idle_timeout_secs = secs;
            }
        }

        if let Ok(max) = std::env::var("NETSDR_MAX_CONNECTIONS") {
            if let Ok(n) = max.parse() {
                self.max_connections = n;
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::ValidationError(
                "network.max_connections must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns idle timeout as Duration.
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }
}

/// UDP timed sender configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Whether the sender runs alongside the echo server.
    pub enabled: bool,
    /// Where data items are sent.
    #[serde(with = "socket_addr_serde")]
    pub target_addr: SocketAddr,
    /// Time between blocks in milliseconds.
    pub interval_ms: u64,
    /// Random sample bytes per block, after the sequence number.
    pub block_size: usize,
    /// Data item type stamped on each block.
    pub message_type: MessageType,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            target_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, DEFAULT_DATA_PORT)),
            interval_ms: 5000,
            block_size: 1024,
            message_type: MessageType::DataItem0,
        }
    }
}

impl SenderConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(enabled) = std::env::var("NETSDR_SENDER_ENABLED") {
            self.enabled = enabled == "1" || enabled.to_lowercase() == "true";
        }

        if let Ok(addr) = std::env::var("NETSDR_SENDER_TARGET") {
            if let Ok(parsed) = addr.parse() {
                self.target_addr = parsed;
            }
        }

        if let Ok(interval) = std::env::var("NETSDR_SENDER_INTERVAL_MS") {
            if let Ok(ms) = interval.parse() {
                self.interval_ms = ms;
            }
        }

        if let Ok(size) = std::env::var("NETSDR_SENDER_BLOCK_SIZE") {
            if let Ok(n) = size.parse() {
                self.block_size = n;
            }
        }
    }

    /// Checks the interval, block size and message type.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "sender.interval_ms must be at least 1".to_string(),
            ));
        }
        if self.block_size > MAX_BLOCK_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "sender.block_size {} exceeds {}",
                self.block_size, MAX_BLOCK_SIZE
            )));
        }
        if !self.message_type.is_data_item() {
            return Err(ConfigError::ValidationError(format!(
                "sender.message_type {:?} is not a data item type",
                self.message_type
            )));
        }
        Ok(())
    }

    /// Returns the send interval as Duration.
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Configuration error.
#[derive(Debug)]
pub enum ConfigError {
    IoError(PathBuf, std::io::Error),
    ParseError(PathBuf, String),
    ValidationError(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, e) => {
                write!(f, "failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::ValidationError(msg) => {
                write!(f, "configuration validation failed: {}", msg)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Custom serde module for SocketAddr (to handle as string in YAML).
mod socket_addr_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::net::SocketAddr;

    pub fn serialize<S>(addr: &SocketAddr, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&addr.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
