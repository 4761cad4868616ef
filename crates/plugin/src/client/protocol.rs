//! ProtocolClient: lifecycle of one plugin connection bound to one generation.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::handshake::HandshakeConfig;
use super::rpc::{GrpcSchemaRpc, PluginConnection};
use crate::types::{ConnectionStatus, Generation, PluginError};
use crate::wire::{GetProviderSchemaV6, GetSchemaV5, SchemaMethod, v5, v6};

/// The schema call on an established connection.
pub trait SchemaRpc: Send {
    type Response;

    fn get_provider_schema(&mut self) -> Result<Self::Response, PluginError>;

    /// Release the connection; later calls fail. Idempotent.
    fn shutdown(&mut self);
}

/// A connection bound to the generation the handshake selected.
pub enum Negotiated {
    GenerationA(Box<dyn SchemaRpc<Response = v5::GetProviderSchemaResponse>>),
    GenerationB(Box<dyn SchemaRpc<Response = v6::GetProviderSchemaResponse>>),
}

impl Negotiated {
    pub fn generation(&self) -> Generation {
        match self {
            Negotiated::GenerationA(_) => Generation::A,
            Negotiated::GenerationB(_) => Generation::B,
        }
    }

    fn shutdown(&mut self) {
        match self {
            Negotiated::GenerationA(rpc) => rpc.shutdown(),
            Negotiated::GenerationB(rpc) => rpc.shutdown(),
        }
    }
}

impl fmt::Debug for Negotiated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Negotiated").field(&self.generation()).finish()
    }
}

/// Starts a plugin and negotiates one of the offered generations.
pub trait PluginLauncher: Send + Sync {
    fn launch(&self, executable: &Path, offer: &[Generation]) -> Result<Negotiated, PluginError>;
}

/// Launches plugin executables and speaks gRPC to them.
#[derive(Debug, Clone, Default)]
pub struct GrpcLauncher {
    config: HandshakeConfig,
}

impl GrpcLauncher {
    pub fn new(config: HandshakeConfig) -> Self {
        Self { config }
    }
}

impl PluginLauncher for GrpcLauncher {
    fn launch(&self, executable: &Path, offer: &[Generation]) -> Result<Negotiated, PluginError> {
        let connection = PluginConnection::open(executable, &self.config, offer)?;
        Ok(match connection.generation {
            Generation::A => Negotiated::GenerationA(bind::<GetSchemaV5>(connection)),
            Generation::B => Negotiated::GenerationB(bind::<GetProviderSchemaV6>(connection)),
        })
    }
}

fn bind<M: SchemaMethod>(connection: PluginConnection) -> Box<dyn SchemaRpc<Response = M::Response>> {
    Box::new(GrpcSchemaRpc::<M>::new(connection))
}

#[derive(Debug)]
enum ConnectionState {
    Unconnected,
    Negotiating,
    Connected(Negotiated),
    Closed,
}

/// One plugin process and its negotiated schema RPC.
///
/// `Unconnected -> Negotiating -> Connected(generation) -> Closed`. A failed
/// connect leaves the client `Closed`; [`ProtocolClient::close`] is idempotent
/// and also runs on drop.
#[derive(Debug)]
pub struct ProtocolClient {
    executable: PathBuf,
    state: ConnectionState,
}

impl ProtocolClient {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            state: ConnectionState::Unconnected,
        }
    }

    /// Launch the plugin offering `offer` and bind to whichever generation it selects.
    pub fn connect(&mut self, launcher: &dyn PluginLauncher, offer: &[Generation]) -> Result<Generation, PluginError> {
        match self.state {
            ConnectionState::Unconnected => {}
            ConnectionState::Connected(ref negotiated) => return Ok(negotiated.generation()),
            ConnectionState::Negotiating | ConnectionState::Closed => return Err(PluginError::Closed),
        }

        self.state = ConnectionState::Negotiating;
        debug!(path = %self.executable.display(), ?offer, "launching plugin");
        match launcher.launch(&self.executable, offer) {
            Ok(negotiated) => {
                let generation = negotiated.generation();
                self.state = ConnectionState::Connected(negotiated);
                Ok(generation)
            }
            Err(error) => {
                self.state = ConnectionState::Closed;
                Err(error)
            }
        }
    }

    pub fn status(&self) -> ConnectionStatus {
        match &self.state {
            ConnectionState::Unconnected => ConnectionStatus::Unconnected,
            ConnectionState::Negotiating => ConnectionStatus::Negotiating,
            ConnectionState::Connected(negotiated) => ConnectionStatus::Connected(negotiated.generation()),
            ConnectionState::Closed => ConnectionStatus::Closed,
        }
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Raw generation A schema response.
    pub fn schema_a(&mut self) -> Result<v5::GetProviderSchemaResponse, PluginError> {
        match &mut self.state {
            ConnectionState::Connected(Negotiated::GenerationA(rpc)) => rpc.get_provider_schema(),
            ConnectionState::Connected(Negotiated::GenerationB(_)) => Err(PluginError::rpc(
                Generation::A,
                "connection negotiated protocol 6",
            )),
            ConnectionState::Closed => Err(PluginError::Closed),
            _ => Err(PluginError::NotConnected),
        }
    }

    /// Raw generation B schema response.
    pub fn schema_b(&mut self) -> Result<v6::GetProviderSchemaResponse, PluginError> {
        match &mut self.state {
            ConnectionState::Connected(Negotiated::GenerationB(rpc)) => rpc.get_provider_schema(),
            ConnectionState::Connected(Negotiated::GenerationA(_)) => Err(PluginError::rpc(
                Generation::B,
                "connection negotiated protocol 5",
            )),
            ConnectionState::Closed => Err(PluginError::Closed),
            _ => Err(PluginError::NotConnected),
        }
    }

    /// Terminate the plugin and release the transport. Idempotent.
    pub fn close(&mut self) {
        if let ConnectionState::Connected(mut negotiated) = std::mem::replace(&mut self.state, ConnectionState::Closed) {
            negotiated.shutdown();
            debug!(path = %self.executable.display(), "plugin connection closed");
        }
    }
}

impl Drop for ProtocolClient {
    fn drop(&mut self) {
        self.close();
    }
}
