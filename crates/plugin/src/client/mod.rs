//! Plugin client subsystem facade.
//!
//! - [`GrpcLauncher`] spawns a plugin and negotiates a generation.
//! - [`ProtocolClient`] owns one negotiated connection.
//! - [`UniversalClient`] layers the protocol 6 to protocol 5 fallback on top.

mod handshake;
mod protocol;
mod rpc;
mod stdio;
mod universal;

pub use handshake::{
    Announcement, HandshakeConfig, MAGIC_COOKIE_KEY, MAGIC_COOKIE_VALUE, Network, parse_announcement,
};
pub use protocol::{GrpcLauncher, Negotiated, PluginLauncher, ProtocolClient, SchemaRpc};
pub use rpc::GrpcSchemaRpc;
pub use universal::UniversalClient;
