//! UniversalClient: schema retrieval that prefers protocol 6 and falls back to protocol 5.

use std::path::Path;

use provschema_types::ProviderSchema;
use tracing::warn;

use super::protocol::{PluginLauncher, ProtocolClient};
use crate::translate::translate;
use crate::types::{Generation, PluginError};

/// Fetches a provider's schema from whichever generation works.
pub struct UniversalClient<'a> {
    launcher: &'a dyn PluginLauncher,
    client: ProtocolClient,
}

impl<'a> UniversalClient<'a> {
    /// Launch `executable` offering both generations.
    ///
    /// If the plugin cannot be reached that way, one retry offers protocol 5
    /// alone. When both attempts fail the error names each failure.
    pub fn connect(launcher: &'a dyn PluginLauncher, executable: &Path) -> Result<Self, PluginError> {
        let mut client = ProtocolClient::new(executable);
        let first = match client.connect(launcher, &Generation::PREFERRED) {
            Ok(_) => return Ok(Self { launcher, client }),
            Err(error) if error.is_transport_failure() => error,
            Err(error) => return Err(error),
        };

        warn!(path = %executable.display(), error = %first, "plugin connect failed; retrying with protocol 5 only");
        let mut fallback = ProtocolClient::new(executable);
        match fallback.connect(launcher, &[Generation::A]) {
            Ok(_) => Ok(Self {
                launcher,
                client: fallback,
            }),
            Err(second) => Err(PluginError::ConnectFailed {
                generation_b: Box::new(first),
                generation_a: Box::new(second),
            }),
        }
    }

    /// Generation of the live connection, if any.
    pub fn generation(&self) -> Option<Generation> {
        self.client.status().generation()
    }

    /// Fetch and translate the provider schema.
    ///
    /// A protocol 6 failure closes the connection and retries once over a
    /// fresh protocol 5 connection; the protocol 6 error is only reported when
    /// the retry fails as well.
    pub fn schema(&mut self) -> Result<ProviderSchema, PluginError> {
        match self.generation() {
            Some(Generation::A) => self.client.schema_a().map(|response| translate(&response)),
            Some(Generation::B) => match self.client.schema_b() {
                Ok(response) => Ok(translate(&response)),
                Err(generation_b) => {
                    warn!(
                        path = %self.client.executable().display(),
                        error = %generation_b,
                        "protocol 6 schema call failed; retrying over protocol 5"
                    );
                    self.client.close();
                    let mut fallback = ProtocolClient::new(self.client.executable());
                    let result = fallback
                        .connect(self.launcher, &[Generation::A])
                        .and_then(|_| fallback.schema_a());
                    self.client = fallback;
                    result
                        .map(|response| translate(&response))
                        .map_err(|generation_a| PluginError::SchemaUnavailable {
                            generation_b: Box::new(generation_b),
                            generation_a: Box::new(generation_a),
                        })
                }
            },
            None => Err(PluginError::Closed),
        }
    }

    /// Terminate the plugin. Idempotent; also runs on drop.
    pub fn close(&mut self) {
        self.client.close();
    }
}
