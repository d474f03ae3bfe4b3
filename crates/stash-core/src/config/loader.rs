//! Configuration loading from file and environment

use super::{ConfigError, StashConfig};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "STASH_";

/// Default config file location (`~/.stash/config.toml`)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".stash").join("config.toml"))
}

/// Load configuration from a TOML file
///
/// Returns the default config if the file doesn't exist.
pub fn load_from_file(path: &Path) -> Result<StashConfig, ConfigError> {
    if !path.exists() {
        debug!("No config file at {:?}, using defaults", path);
        return Ok(StashConfig::default());
    }

    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Apply `STASH_*` overrides read through `lookup`
pub fn apply_env_overrides<F>(config: &mut StashConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(&format!("{}{}", ENV_PREFIX, name));

    if let Some(url) = var("REMOTE_URL") {
        config.remote.base_url = url;
    }
    if let Some(token) = var("REMOTE_TOKEN") {
        config.remote.auth_token = Some(token).filter(|t| !t.is_empty());
    }
    if let Some(timeout) = var("REMOTE_TIMEOUT_SECS") {
        config.remote.timeout_secs = timeout.parse().map_err(|_| ConfigError::Invalid {
            key: format!("{}REMOTE_TIMEOUT_SECS", ENV_PREFIX),
            message: format!("'{}' is not a number of seconds", timeout),
        })?;
    }
    if let Some(dir) = var("DATA_DIR") {
        config.storage.data_dir = Some(PathBuf::from(dir));
    }
    if let Some(level) = var("LOG_LEVEL") {
        config.logging.level = level;
    }

    Ok(())
}

/// Load the effective configuration
///
/// An explicit `path` must exist; without one the default location is used
/// when present.
pub fn load_config(path: Option<&Path>) -> Result<StashConfig, ConfigError> {
    let mut config = match path {
        Some(path) if !path.exists() => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
            });
        }
        Some(path) => load_from_file(path)?,
        None => match default_config_path() {
            Some(path) => load_from_file(&path)?,
            None => StashConfig::default(),
        },
    };

    apply_env_overrides(&mut config, |name| std::env::var(name).ok())?;
    config.validate()?;

    Ok(config)
}
