//! Seams between the schema store and the outside world.
//!
//! The store talks to the registry and the filesystem through these traits so
//! tests can count and script every call. The default implementations wrap
//! the async registry client and the zip extractor.

use std::path::Path;
use std::time::Duration;

use provschema_api::{DownloadInfo, Platform, RegistryClient, RegistryError};
use provschema_types::{ProviderRequest, VersionsRequest};
use provschema_util::{ArchiveError, block_on_future, extract_zip};

/// Registry lookups and archive downloads.
pub trait RegistrySource: Send + Sync {
    /// Version strings published for a provider, in registry order.
    fn list_versions(&self, request: &VersionsRequest) -> Result<Vec<String>, RegistryError>;

    /// Download metadata for an exact version on `platform`.
    fn download_info(&self, request: &ProviderRequest, platform: &Platform) -> Result<DownloadInfo, RegistryError>;

    /// Fetch `url` into `destination`.
    fn download(&self, url: &str, destination: &Path) -> Result<(), RegistryError>;
}

/// Blocking adapter over [`RegistryClient`].
#[derive(Debug, Clone)]
pub struct HttpRegistrySource {
    client: RegistryClient,
}

impl HttpRegistrySource {
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        Ok(Self {
            client: RegistryClient::new(timeout)?,
        })
    }
}

impl RegistrySource for HttpRegistrySource {
    fn list_versions(&self, request: &VersionsRequest) -> Result<Vec<String>, RegistryError> {
        block_on_future(
            self.client
                .list_versions(&request.registry, &request.namespace, &request.name),
        )
    }

    fn download_info(&self, request: &ProviderRequest, platform: &Platform) -> Result<DownloadInfo, RegistryError> {
        block_on_future(self.client.download_info(
            &request.registry,
            &request.namespace,
            &request.name,
            &request.version,
            platform,
        ))
    }

    fn download(&self, url: &str, destination: &Path) -> Result<(), RegistryError> {
        block_on_future(async { self.client.download(url, destination).await.map(|_| ()) })
    }
}

/// Unpacks a downloaded package.
pub trait ArchiveExtractor: Send + Sync {
    fn extract(&self, archive: &Path, destination: &Path) -> Result<(), ArchiveError>;
}

/// Extracts zip packages.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipExtractor;

impl ArchiveExtractor for ZipExtractor {
    fn extract(&self, archive: &Path, destination: &Path) -> Result<(), ArchiveError> {
        extract_zip(archive, destination)
    }
}
