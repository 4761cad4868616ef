//! Provider plugin access.
//!
//! Launches provider plugin executables, negotiates a protocol generation
//! over the plugin handshake, calls the schema RPC over gRPC, and translates
//! either generation's response into the canonical
//! [`provschema_types::ProviderSchema`].

pub mod client;
pub mod translate;
pub mod types;
pub mod wire;

pub use client::{
    GrpcLauncher, HandshakeConfig, Negotiated, PluginLauncher, ProtocolClient, SchemaRpc, UniversalClient,
};
pub use translate::translate;
pub use types::{ConnectionStatus, Generation, PluginError};
