//! Error types for provider plugin connections.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::Generation;

/// Errors launching, negotiating with, or calling a provider plugin.
///
/// Transport failures (the plugin could not be started or reached) are kept
/// apart from RPC failures on an established connection; see
/// [`PluginError::is_transport_failure`].
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to start plugin {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("handshake error: {message}")]
    Handshake { message: String },

    #[error("{operation} timed out after {timeout_ms}ms")]
    Timeout { operation: String, timeout_ms: u64 },

    #[error("transport error: {message}")]
    Transport { message: String },

    #[error("plugin runtime error: {0}")]
    Runtime(#[source] io::Error),

    #[error("could not connect with either generation (protocol 6: {generation_b}; protocol 5: {generation_a})")]
    ConnectFailed {
        generation_b: Box<PluginError>,
        generation_a: Box<PluginError>,
    },

    #[error("schema call over {generation} failed: {message}")]
    Rpc { generation: Generation, message: String },

    #[error("provider schema unavailable (protocol 6: {generation_b}; protocol 5: {generation_a})")]
    SchemaUnavailable {
        generation_b: Box<PluginError>,
        generation_a: Box<PluginError>,
    },

    #[error("plugin client is not connected")]
    NotConnected,

    #[error("plugin client is closed")]
    Closed,
}

impl PluginError {
    /// Create a handshake error.
    pub fn handshake(message: impl Into<String>) -> Self {
        Self::Handshake { message: message.into() }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            operation: operation.into(),
            timeout_ms,
        }
    }

    /// Create a transport error.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport { message: message.into() }
    }

    /// Create an RPC error for a call on an established connection.
    pub fn rpc(generation: Generation, message: impl Into<String>) -> Self {
        Self::Rpc {
            generation,
            message: message.into(),
        }
    }

    /// True when the plugin could not be started or reached at all.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::Spawn { .. }
                | Self::Handshake { .. }
                | Self::Timeout { .. }
                | Self::Transport { .. }
                | Self::Runtime(_)
                | Self::ConnectFailed { .. }
        )
    }
}
