use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures talking to a provider registry.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("invalid registry URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("registry request {url} returned status {status}")]
    Status { url: String, status: u16 },

    #[error("could not decode registry response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("registry returned no download URL for {url}")]
    MissingDownloadUrl { url: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("i/o error writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RegistryError {
    pub(crate) fn transport(url: &str, source: reqwest::Error) -> Self {
        RegistryError::Transport {
            url: url.to_string(),
            source,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        RegistryError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RegistryError::NotFound { .. })
    }
}

impl From<io::Error> for RegistryError {
    fn from(source: io::Error) -> Self {
        RegistryError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
