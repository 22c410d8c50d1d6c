//! TOML configuration for a connector deployment.
//!
//! ```toml
//! [device]
//! key = "dev1"
//! password = "secret"
//! actuators = ["SW", "SL"]
//!
//! [connector]
//! queue_capacity = 100
//! keep_alive_enabled = true
//! keep_alive_interval_secs = 60
//! firmware_enabled = true
//! chunk_size = 65536
//! max_file_size = 104857600
//! publish_period_secs = 5
//!
//! [logging]
//! level = "info"
//! ```
//!
//! Every field except the device key and password has a default, so a
//! minimal file only needs the `[device]` table.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use devlink_core::queue::DEFAULT_QUEUE_CAPACITY;
use devlink_core::Device;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
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

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is syntactically valid but unusable.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level connector configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectorConfig {
    pub device: DeviceConfig,
    #[serde(default)]
    pub connector: ConnectorSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device identity as registered on the platform.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    pub key: String,
    pub password: String,
    /// Actuator references the device accepts commands for.
    #[serde(default)]
    pub actuators: Vec<String>,
}

/// Connector behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConnectorSettings {
    /// Messages buffered while the transport is unavailable.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_true")]
    pub keep_alive_enabled: bool,
    #[serde(default = "default_keep_alive_interval_secs")]
    pub keep_alive_interval_secs: u64,
    /// Accept firmware updates from the platform.
    #[serde(default)]
    pub firmware_enabled: bool,
    /// Firmware chunk size requested from the platform, in bytes.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u64,
    /// Largest firmware file accepted, in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
    /// Seconds between simulated readings in `devlink-sim`.
    #[serde(default = "default_publish_period_secs")]
    pub publish_period_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// `tracing` level used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}
fn default_true() -> bool {
    true
}
fn default_keep_alive_interval_secs() -> u64 {
    60
}
fn default_chunk_size() -> u64 {
    64 * 1024
}
fn default_max_file_size() -> u64 {
    100 * 1024 * 1024
}
fn default_publish_period_secs() -> u64 {
    5
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ConnectorSettings {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            keep_alive_enabled: default_true(),
            keep_alive_interval_secs: default_keep_alive_interval_secs(),
            firmware_enabled: false,
            chunk_size: default_chunk_size(),
            max_file_size: default_max_file_size(),
            publish_period_secs: default_publish_period_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ConnectorConfig {
    /// A config for a demo device with one switch and one slider.
    pub fn demo() -> Self {
        Self {
            device: DeviceConfig {
                key: "devlink-sim".to_string(),
                password: "change-me".to_string(),
                actuators: vec!["SW".to_string(), "SL".to_string()],
            },
            connector: ConnectorSettings {
                firmware_enabled: true,
                ..ConnectorSettings::default()
            },
            logging: LoggingConfig::default(),
        }
    }

    /// Builds the [`Device`] described by the `[device]` table.
    pub fn to_device(&self) -> Device {
        Device::new(
            self.device.key.as_str(),
            self.device.password.as_str(),
            self.device.actuators.iter().map(String::as_str),
        )
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.connector.keep_alive_interval_secs)
    }

    pub fn publish_period(&self) -> Duration {
        Duration::from_secs(self.connector.publish_period_secs)
    }

    /// Checks values the type system cannot.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.key.is_empty() {
            return Err(ConfigError::Invalid("device.key must not be empty".to_string()));
        }
        if self.device.actuators.iter().any(String::is_empty) {
            return Err(ConfigError::Invalid(
                "device.actuators must not contain empty references".to_string(),
            ));
        }
        if self.connector.keep_alive_enabled && self.connector.keep_alive_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "connector.keep_alive_interval_secs must be positive".to_string(),
            ));
        }
        if self.connector.chunk_size == 0 {
            return Err(ConfigError::Invalid("connector.chunk_size must be positive".to_string()));
        }
        if self.connector.publish_period_secs == 0 {
            return Err(ConfigError::Invalid(
                "connector.publish_period_secs must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Loads and validates a config file.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read,
/// [`ConfigError::Parse`] if the TOML is malformed, and
/// [`ConfigError::Invalid`] if validation fails.
pub fn load_from(path: &Path) -> Result<ConnectorConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let cfg: ConnectorConfig = toml::from_str(&content)?;
    cfg.validate()?;
    Ok(cfg)
}

/// Loads a config file, returning [`ConnectorConfig::demo`] if it does not
/// exist yet.
///
/// # Errors
///
/// As [`load_from`], except that a missing file is not an error.
pub fn load_or_default(path: &Path) -> Result<ConnectorConfig, ConfigError> {
    match load_from(path) {
        Err(ConfigError::Io { source, .. }) if source.kind() == std::io::ErrorKind::NotFound => {
            Ok(ConnectorConfig::demo())
        }
        other => other,
    }
}

/// Persists `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_to(config: &ConnectorConfig, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir()
            .join(format!("devlink-config-test-{}", std::process::id()))
            .join(name)
    }

    #[test]
    fn test_minimal_file_gets_defaults() {
        // Arrange
        let toml_str = r#"
            [device]
            key = "dev1"
            password = "secret"
        "#;

        // Act
        let cfg: ConnectorConfig = toml::from_str(toml_str).expect("parse");

        // Assert
        assert!(cfg.device.actuators.is_empty());
        assert_eq!(cfg.connector.queue_capacity, 100);
        assert!(cfg.connector.keep_alive_enabled);
        assert_eq!(cfg.keep_alive_interval(), Duration::from_secs(60));
        assert!(!cfg.connector.firmware_enabled);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        // Arrange
        let mut cfg = ConnectorConfig::demo();
        cfg.connector.queue_capacity = 7;
        cfg.logging.level = "debug".to_string();

        // Act
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let restored: ConnectorConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert_eq!(cfg, restored);
    }

    #[test]
    fn test_to_device_carries_actuators() {
        let device = ConnectorConfig::demo().to_device();

        assert_eq!(device.key(), "devlink-sim");
        assert!(device.has_actuator("SW"));
        assert!(device.has_actuator("SL"));
    }

    #[test]
    fn test_validate_rejects_zero_keep_alive_interval() {
        let mut cfg = ConnectorConfig::demo();
        cfg.connector.keep_alive_interval_secs = 0;

        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_empty_key() {
        let mut cfg = ConnectorConfig::demo();
        cfg.device.key.clear();

        assert!(matches!(cfg.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let path = scratch_path("malformed.toml");
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, "[device\nkey = ").expect("write");

        let result = load_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file_loads_demo_config() {
        let path = scratch_path("does-not-exist.toml");

        let cfg = load_or_default(&path).expect("missing file is not an error");

        assert_eq!(cfg, ConnectorConfig::demo());
    }

    #[test]
    fn test_save_then_load_returns_same_config() {
        // Arrange
        let path = scratch_path("nested/dir/connector.toml");
        let mut cfg = ConnectorConfig::demo();
        cfg.connector.chunk_size = 512;

        // Act
        save_to(&cfg, &path).expect("save");
        let loaded = load_from(&path).expect("load");

        // Assert
        assert_eq!(loaded, cfg);
    }
}
