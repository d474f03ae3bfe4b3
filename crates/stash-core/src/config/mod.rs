//! Configuration for Stash
//!
//! Loaded from defaults, then an optional TOML file, then `STASH_*`
//! environment variables.

mod loader;

pub use loader::{ENV_PREFIX, apply_env_overrides, default_config_path, load_config, load_from_file};

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Remote service settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the saved-articles API
    pub base_url: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Optional bearer token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000/api".to_string(),
            timeout_secs: 30,
            auth_token: None,
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Local storage settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory for persisted values (defaults to `~/.stash/store`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

impl StorageConfig {
    /// Resolved data directory, `None` if no home directory is known
    pub fn resolved_data_dir(&self) -> Option<PathBuf> {
        self.data_dir
            .clone()
            .or_else(|| dirs::home_dir().map(|home| home.join(".stash").join("store")))
    }
}

/// Follow-up behavior of mutations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Re-read the saved count after a successful toggle
    pub refresh_count_after_toggle: bool,
    /// Re-read the saved count after a list removal to correct local arithmetic
    pub reconcile_count_after_removal: bool,
    /// Buffered events per subscriber
    pub event_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_count_after_toggle: true,
            reconcile_count_after_removal: true,
            event_capacity: 256,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StashConfig {
    pub remote: RemoteConfig,
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

impl StashConfig {
    /// Check values that deserialize fine but cannot work
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "remote.base_url".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        if self.remote.timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "remote.timeout_secs".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.sync.event_capacity == 0 {
            return Err(ConfigError::Invalid {
                key: "sync.event_capacity".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        match self.logging.format.as_str() {
            "json" | "pretty" | "compact" => Ok(()),
            other => Err(ConfigError::Invalid {
                key: "logging.format".to_string(),
                message: format!("unknown format '{}'", other),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = StashConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.sync.refresh_count_after_toggle);
        assert_eq!(config.remote.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = StashConfig::default();
        config.remote.timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { key, .. }) if key == "remote.timeout_secs"
        ));
    }

    #[test]
    fn test_validate_rejects_unknown_log_format() {
        let mut config = StashConfig::default();
        config.logging.format = "xml".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let storage = StorageConfig {
            data_dir: Some(PathBuf::from("/var/lib/stash")),
        };
        assert_eq!(
            storage.resolved_data_dir(),
            Some(PathBuf::from("/var/lib/stash"))
        );
    }
}
