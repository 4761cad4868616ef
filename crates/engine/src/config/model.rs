//! Data models for schema store configuration.

use std::time::Duration;

use provschema_plugin::HandshakeConfig;
use provschema_plugin::client::{MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE};
use provschema_types::DEFAULT_REGISTRY;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Settings for a [`crate::SchemaStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Registry base URL used for requests that do not name one.
    pub registry: String,
    /// File name prefix of the provider executable inside a package.
    pub executable_prefix: String,
    /// Prefix of the per-process temporary directory.
    pub temp_dir_prefix: String,
    /// Timeout for each registry request, including archive downloads.
    pub http_timeout_secs: u64,
    pub handshake: HandshakeSettings,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            registry: DEFAULT_REGISTRY.to_string(),
            executable_prefix: "terraform-provider-".to_string(),
            temp_dir_prefix: "provschema-".to_string(),
            http_timeout_secs: 120,
            handshake: HandshakeSettings::default(),
        }
    }
}

impl StoreConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Handshake settings for the plugin launcher.
    pub fn handshake_config(&self) -> HandshakeConfig {
        HandshakeConfig {
            magic_cookie_key: self.handshake.magic_cookie_key.clone(),
            magic_cookie_value: self.handshake.magic_cookie_value.clone(),
            startup_timeout: Duration::from_secs(self.handshake.startup_timeout_secs),
            ..HandshakeConfig::default()
        }
    }
}

/// Plugin handshake settings as written in the config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct HandshakeSettings {
    pub magic_cookie_key: String,
    pub magic_cookie_value: String,
    pub startup_timeout_secs: u64,
}

impl Default for HandshakeSettings {
    fn default() -> Self {
        Self {
            magic_cookie_key: MAGIC_COOKIE_KEY.to_string(),
            magic_cookie_value: MAGIC_COOKIE_VALUE.to_string(),
            startup_timeout_secs: 60,
        }
    }
}

/// Errors loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid config: {0}")]
    Invalid(String),
}
