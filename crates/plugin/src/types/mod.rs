//! Core types for provider plugin connections.

mod errors;
mod generation;

pub use errors::PluginError;
pub use generation::{ConnectionStatus, Generation};
