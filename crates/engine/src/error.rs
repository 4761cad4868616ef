//! Error type for schema store operations.

use std::io;
use std::path::PathBuf;

use provschema_api::RegistryError;
use provschema_plugin::PluginError;
use provschema_util::ArchiveError;
use thiserror::Error;

use crate::version::ResolveError;

/// Errors surfaced by [`crate::SchemaStore`].
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Provider, version, or named schema does not exist.
    #[error("{what} not found")]
    NotFound { what: String },

    /// The registry answered with an unexpected status or body.
    #[error("registry error: {0}")]
    UpstreamApi(#[source] RegistryError),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The extracted package does not contain the provider executable.
    #[error("no entry starting with '{expected_prefix}' in {}", search_dir.display())]
    InvariantViolation {
        expected_prefix: String,
        search_dir: PathBuf,
    },

    #[error("failed to extract provider package: {0}")]
    Extract(#[from] ArchiveError),

    #[error("i/o error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl SchemaError {
    /// Create a not found error.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<RegistryError> for SchemaError {
    fn from(error: RegistryError) -> Self {
        match error {
            RegistryError::NotFound { url } => SchemaError::NotFound { what: url },
            other => SchemaError::UpstreamApi(other),
        }
    }
}
