//! Node configuration file handling
//!
//! Provides default configuration generation and loading for a super-peer
//! running the group ledger. Configuration files are TOML.
//!
//! Everything here is optional: a file containing only `[ledger]` (or
//! nothing at all) loads with defaults for the rest.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::sweeper::MIN_SWEEP_INTERVAL;

/// Default log level
const DEFAULT_LOG_LEVEL: &str = "info";

/// Default replication factor
pub const DEFAULT_REPLICATION_FACTOR: usize = 3;

/// Default background sweep interval
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write config file '{path}': {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Super-peer ledger configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Replication settings
    #[serde(default)]
    pub ledger: ReplicationConfig,

    /// Background expiry sweeping
    #[serde(default)]
    pub sweeper: SweeperConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Replication settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    /// Number of peers that should hold a copy of every object
    #[serde(default = "default_replication_factor")]
    pub replication_factor: usize,
}

/// Background sweeper settings
///
/// Disabled by default: expired entries are then only evicted when a repair
/// query runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweeperConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Time between sweeps, e.g. "30s" or "5m"
    #[serde(default = "default_sweep_interval", with = "humantime_serde")]
    pub interval: Duration,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

fn default_replication_factor() -> usize {
    DEFAULT_REPLICATION_FACTOR
}

fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_INTERVAL
}

fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            replication_factor: DEFAULT_REPLICATION_FACTOR,
        }
    }
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            file: None,
        }
    }
}

/// `humantime` strings for `Duration` fields.
mod humantime_serde {
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&humantime::format_duration(*value).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        humantime::parse_duration(&raw).map_err(D::Error::custom)
    }
}

impl LedgerConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: LedgerConfig = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        write_file(path, &contents)
    }

    /// Check values that would make the node misbehave.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ledger.replication_factor == 0 {
            return Err(ConfigError::Invalid(
                "replication_factor must be at least 1".to_string(),
            ));
        }

        if self.sweeper.enabled && self.sweeper.interval < MIN_SWEEP_INTERVAL {
            return Err(ConfigError::Invalid(format!(
                "sweeper interval must be at least {}",
                humantime::format_duration(MIN_SWEEP_INTERVAL)
            )));
        }

        Ok(())
    }

    /// Generate default configuration content as a string with comments
    pub fn generate_default_toml() -> String {
        format!(
            r#"# Replica Ledger Configuration
#
# Settings for the super-peer that tracks which peers of the group hold
# which objects.

[ledger]
# Number of peers that should hold a copy of every object.
# Objects with fewer recorded holders are reported as needing repair.
replication_factor = {replication_factor}

[sweeper]
# Periodically evict expired placements in the background.
# When disabled, expired placements are evicted only by repair queries.
enabled = false
interval = "{interval}"

[logging]
# Log level: trace, debug, info, warn, error
level = "{level}"

# Log file path (optional, logs to stderr if not specified)
# file = "/var/log/replica-ledger/ledger.log"
"#,
            replication_factor = DEFAULT_REPLICATION_FACTOR,
            interval = humantime::format_duration(DEFAULT_SWEEP_INTERVAL),
            level = DEFAULT_LOG_LEVEL,
        )
    }

    /// Create and save a default configuration file
    pub fn create_default(config_path: &Path) -> Result<(), ConfigError> {
        write_file(config_path, &Self::generate_default_toml())
    }
}

fn write_file(path: &Path, contents: &str) -> Result<(), ConfigError> {
    let write_err = |source| ConfigError::Write {
        path: path.to_path_buf(),
        source,
    };

    // Create parent directory if needed
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(write_err)?;
    }

    fs::write(path, contents).map_err(write_err)
}

/// Get the default config file path
///
/// `<data dir>/replica-ledger/config.toml`, e.g.
/// `~/.local/share/replica-ledger/config.toml` on Linux.
pub fn default_config_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("replica-ledger")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = LedgerConfig::default();

        assert_eq!(config.ledger.replication_factor, 3);
        assert!(!config.sweeper.enabled);
        assert_eq!(config.sweeper.interval, Duration::from_secs(30));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");

        let mut config = LedgerConfig::default();
        config.ledger.replication_factor = 5;
        config.sweeper.enabled = true;
        config.sweeper.interval = Duration::from_secs(300);
        config.save(&config_path).unwrap();

        let loaded = LedgerConfig::load(&config_path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_create_default_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        LedgerConfig::create_default(&config_path).unwrap();

        assert!(config_path.exists());
        let config = LedgerConfig::load(&config_path).unwrap();
        assert_eq!(config, LedgerConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: LedgerConfig = toml::from_str(
            r#"
[sweeper]
enabled = true
interval = "5m"
"#,
        )
        .unwrap();

        assert_eq!(config.ledger.replication_factor, 3);
        assert!(config.sweeper.enabled);
        assert_eq!(config.sweeper.interval, Duration::from_secs(300));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = LedgerConfig::default();
        config.ledger.replication_factor = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = LedgerConfig::default();
        config.sweeper.enabled = true;
        config.sweeper.interval = Duration::ZERO;
        assert!(config.validate().is_err());
        config.sweeper.interval = Duration::from_millis(500);
        assert!(config.validate().is_err());

        // A zero interval is harmless while the sweeper is off
        config.sweeper.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_bad_interval() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "[sweeper]\ninterval = \"soon\"\n").unwrap();

        assert!(matches!(
            LedgerConfig::load(&config_path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = LedgerConfig::load(&temp_dir.path().join("absent.toml"));

        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("replica-ledger/config.toml"));
    }
}
