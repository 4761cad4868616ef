//! Configuration IO helpers for the schema store.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dirs_next::config_dir;
use provschema_util::expand_tilde;

use super::model::{ConfigError, StoreConfig};

pub const CONFIG_PATH_ENV: &str = "PROVSCHEMA_CONFIG_PATH";
pub const REGISTRY_ENV: &str = "PROVSCHEMA_REGISTRY";

/// Returns the default path for the configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("provschema")
        .join("config.json")
}

/// Loads configuration from the default path.
pub fn load_config() -> Result<StoreConfig, ConfigError> {
    load_config_from_path(&default_config_path())
}

/// Loads configuration from a specific path; a missing file yields defaults.
///
/// `PROVSCHEMA_REGISTRY` overrides the registry from the file.
pub fn load_config_from_path(path: &Path) -> Result<StoreConfig, ConfigError> {
    let mut config = if path.exists() {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?
    } else {
        StoreConfig::default()
    };

    if let Ok(registry) = env::var(REGISTRY_ENV)
        && !registry.trim().is_empty()
    {
        config.registry = registry.trim().to_string();
    }

    validate_config(&config)?;
    Ok(config)
}

/// Reject settings the store cannot work with.
pub fn validate_config(config: &StoreConfig) -> Result<(), ConfigError> {
    if config.executable_prefix.trim().is_empty() {
        return Err(ConfigError::Invalid("executablePrefix must not be empty".into()));
    }
    if config.handshake.magic_cookie_key.trim().is_empty() {
        return Err(ConfigError::Invalid("handshake.magicCookieKey must not be empty".into()));
    }
    if config.http_timeout_secs == 0 {
        return Err(ConfigError::Invalid("httpTimeoutSecs must be greater than zero".into()));
    }
    provschema_api::validate_base_url(&config.registry).map_err(|error| ConfigError::Invalid(error.to_string()))
}
