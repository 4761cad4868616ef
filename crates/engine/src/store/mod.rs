//! SchemaStore: request-keyed, cached access to provider schemas.
//!
//! Getting a schema resolves the requested version, downloads and unpacks the
//! provider package, runs the plugin to ask for its schema, and caches each
//! step. All three caches share one `RwLock`; plain hits take the shared lock,
//! while misses run their whole creation step under the exclusive lock so
//! concurrent identical requests trigger exactly one download and one plugin
//! launch.

mod cache;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use provschema_api::{Platform, RegistryError};
use provschema_plugin::{GrpcLauncher, PluginLauncher, UniversalClient};
use provschema_types::{Block, FunctionSignature, ProviderRequest, ProviderSchema, SchemaCategory, VersionsRequest};
use provschema_util::{find_entry_with_prefix, strip_extension};
use semver::Version;
use tracing::{debug, info, warn};

use crate::collaborators::{ArchiveExtractor, HttpRegistrySource, RegistrySource, ZipExtractor};
use crate::config::StoreConfig;
use crate::version::{ResolveError, VersionConstraint, exact_version, parse_version, resolve_version};
use crate::SchemaError;
use cache::{CacheKind, Caches, DownloadCache, SchemaCache, VersionsCache, get_or_create_locked};

/// Cached provider schema retrieval.
pub struct SchemaStore {
    config: StoreConfig,
    registry: Arc<dyn RegistrySource>,
    extractor: Arc<dyn ArchiveExtractor>,
    launcher: Arc<dyn PluginLauncher>,
    caches: RwLock<Caches>,
}

impl fmt::Debug for SchemaStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let caches = self.read();
        f.debug_struct("SchemaStore")
            .field("registry", &self.config.registry)
            .field("downloads", &caches.downloads.len())
            .field("schemas", &caches.schemas.len())
            .field("versions", &caches.versions.len())
            .finish()
    }
}

impl SchemaStore {
    /// Store backed by the HTTP registry client, zip extraction and the gRPC launcher.
    pub fn new(config: StoreConfig) -> Result<Self, SchemaError> {
        let registry = HttpRegistrySource::new(config.http_timeout())?;
        let launcher = GrpcLauncher::new(config.handshake_config());
        Ok(Self::with_collaborators(
            config,
            Arc::new(registry),
            Arc::new(ZipExtractor),
            Arc::new(launcher),
        ))
    }

    pub fn with_collaborators(
        config: StoreConfig,
        registry: Arc<dyn RegistrySource>,
        extractor: Arc<dyn ArchiveExtractor>,
        launcher: Arc<dyn PluginLauncher>,
    ) -> Self {
        Self {
            config,
            registry,
            extractor,
            launcher,
            caches: RwLock::new(Caches::default()),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Caches> {
        self.caches.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Caches> {
        self.caches.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check under the shared lock, then re-check and create under the exclusive lock.
    fn get_or_create<C: CacheKind>(
        &self,
        key: &C::Key,
        create: impl FnOnce(&mut Caches) -> Result<C::Value, SchemaError>,
    ) -> Result<C::Value, SchemaError> {
        {
            let caches = self.read();
            if let Some(value) = C::map(&caches).get(key) {
                debug!(cache = C::NAME, %key, "cache hit");
                return Ok(value.clone());
            }
        }
        let mut caches = self.write();
        get_or_create_locked::<C>(&mut caches, key, create)
    }

    /// Fill in the configured registry when a request names none.
    fn with_default_registry(&self, request: &ProviderRequest) -> ProviderRequest {
        if request.registry.trim().is_empty() {
            request.clone().with_registry(self.config.registry.clone())
        } else {
            request.clone()
        }
    }

    /// Published versions of a provider, ascending. Cached per provider.
    pub fn available_versions(&self, request: &VersionsRequest) -> Result<Vec<Version>, SchemaError> {
        let mut request = request.clone();
        if request.registry.trim().is_empty() {
            request.registry = self.config.registry.clone();
        }
        let request = &request;
        self.get_or_create::<VersionsCache>(request, |_| {
            let raw = self.registry.list_versions(request)?;
            let mut versions = raw
                .iter()
                .map(|text| {
                    parse_version(text).map_err(|error| {
                        SchemaError::UpstreamApi(RegistryError::Decode {
                            url: request.to_string(),
                            reason: format!("version '{text}': {error}"),
                        })
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            versions.sort();
            info!(namespace = %request.namespace, name = %request.name, count = versions.len(), "fetched available versions");
            Ok(versions)
        })
    }

    /// Pin `request` to an exact version.
    ///
    /// Exact versions are used as given (minus a leading `v`) without asking
    /// the registry. Otherwise the highest published version matching the
    /// constraint is chosen; an empty or malformed constraint means latest.
    pub fn resolve(&self, request: &ProviderRequest) -> Result<ProviderRequest, SchemaError> {
        let request = self.with_default_registry(request);
        if let Some(exact) = exact_version(&request.version) {
            return Ok(request.with_version(exact));
        }

        let constraint = if request.version.trim().is_empty() {
            None
        } else {
            match VersionConstraint::parse(&request.version) {
                Ok(constraint) => Some(constraint),
                Err(error) => {
                    warn!(version = %request.version, %error, "ignoring malformed version constraint; using latest");
                    None
                }
            }
        };

        let versions = self.available_versions(&request.versions_request())?;
        let resolved = resolve_version(&versions, constraint.as_ref()).map_err(|error| match error {
            ResolveError::Empty => SchemaError::not_found(format!("versions of {}", request.versions_request())),
            ResolveError::NoMatch { constraint } => {
                SchemaError::not_found(format!("version of {} matching '{constraint}'", request.versions_request()))
            }
            other => SchemaError::Resolve(other),
        })?;
        debug!(%request, %resolved, "resolved version");
        Ok(request.with_version(resolved.to_string()))
    }

    /// Download and unpack the provider package; returns the executable path.
    pub fn ensure_downloaded(&self, request: &ProviderRequest) -> Result<PathBuf, SchemaError> {
        let pinned = self.resolve(request)?;
        self.get_or_create::<DownloadCache>(&pinned, |caches| self.download(caches, &pinned))
    }

    /// The full schema of a provider.
    pub fn schema(&self, request: &ProviderRequest) -> Result<Arc<ProviderSchema>, SchemaError> {
        let pinned = self.resolve(request)?;
        self.get_or_create::<SchemaCache>(&pinned, |caches| {
            let executable =
                get_or_create_locked::<DownloadCache>(caches, &pinned, |caches| self.download(caches, &pinned))?;
            self.fetch_schema(&pinned, &executable).map(Arc::new)
        })
    }

    /// Schema of the provider configuration block.
    pub fn provider_schema(&self, request: &ProviderRequest) -> Result<Block, SchemaError> {
        let schema = self.schema(request)?;
        schema
            .config_schema
            .clone()
            .ok_or_else(|| SchemaError::not_found(format!("provider configuration schema for {request}")))
    }

    pub fn resource_schema(&self, request: &ProviderRequest, name: &str) -> Result<Block, SchemaError> {
        let schema = self.schema(request)?;
        lookup(schema.resource(name), SchemaCategory::Resource, name, request)
    }

    pub fn data_source_schema(&self, request: &ProviderRequest, name: &str) -> Result<Block, SchemaError> {
        let schema = self.schema(request)?;
        lookup(schema.data_source(name), SchemaCategory::DataSource, name, request)
    }

    pub fn ephemeral_resource_schema(&self, request: &ProviderRequest, name: &str) -> Result<Block, SchemaError> {
        let schema = self.schema(request)?;
        lookup(schema.ephemeral_resource(name), SchemaCategory::EphemeralResource, name, request)
    }

    pub fn function_signature(&self, request: &ProviderRequest, name: &str) -> Result<FunctionSignature, SchemaError> {
        let schema = self.schema(request)?;
        lookup(schema.function(name), SchemaCategory::Function, name, request)
    }

    /// Sorted names in one category; empty when the provider declares none.
    pub fn names(&self, request: &ProviderRequest, category: SchemaCategory) -> Result<Vec<String>, SchemaError> {
        Ok(self.schema(request)?.names(category).unwrap_or_default())
    }

    pub fn list_resources(&self, request: &ProviderRequest) -> Result<Vec<String>, SchemaError> {
        self.names(request, SchemaCategory::Resource)
    }

    pub fn list_data_sources(&self, request: &ProviderRequest) -> Result<Vec<String>, SchemaError> {
        self.names(request, SchemaCategory::DataSource)
    }

    pub fn list_functions(&self, request: &ProviderRequest) -> Result<Vec<String>, SchemaError> {
        self.names(request, SchemaCategory::Function)
    }

    pub fn list_ephemeral_resources(&self, request: &ProviderRequest) -> Result<Vec<String>, SchemaError> {
        self.names(request, SchemaCategory::EphemeralResource)
    }

    /// Remove the temporary directory and clear every cache. Safe to repeat.
    pub fn cleanup(&self) -> Result<(), SchemaError> {
        let mut caches = self.write();
        caches.clear();
        if let Some(temp_dir) = caches.temp_dir.take() {
            let path = temp_dir.path().to_path_buf();
            temp_dir.close().map_err(|error| SchemaError::io(&path, error))?;
            debug!(path = %path.display(), "removed temporary directory");
        }
        Ok(())
    }

    /// Temporary directory for this store, created on first use.
    fn temp_dir(&self, caches: &mut Caches) -> Result<PathBuf, SchemaError> {
        if let Some(temp_dir) = &caches.temp_dir {
            return Ok(temp_dir.path().to_path_buf());
        }
        let temp_dir = tempfile::Builder::new()
            .prefix(&self.config.temp_dir_prefix)
            .tempdir()
            .map_err(|error| SchemaError::io(std::env::temp_dir(), error))?;
        let path = temp_dir.path().to_path_buf();
        debug!(path = %path.display(), "created temporary directory");
        caches.temp_dir = Some(temp_dir);
        Ok(path)
    }

    fn download(&self, caches: &mut Caches, request: &ProviderRequest) -> Result<PathBuf, SchemaError> {
        let platform = Platform::host();
        let info = self.registry.download_info(request, &platform)?;
        let temp_dir = self.temp_dir(caches)?;

        let file_name = archive_file_name(&info.filename, &self.config.executable_prefix, request, &platform);
        let archive = temp_dir.join(&file_name);
        self.registry.download(&info.download_url, &archive)?;
        info!(
            namespace = %request.namespace,
            name = %request.name,
            version = %request.version,
            path = %archive.display(),
            "downloaded provider package"
        );

        let extract_dir = temp_dir.join(strip_extension(&file_name));
        self.extractor.extract(&archive, &extract_dir)?;

        let prefix = format!("{}{}", self.config.executable_prefix, request.name);
        let executable = find_entry_with_prefix(&extract_dir, &prefix)
            .map_err(|error| SchemaError::io(&extract_dir, error))?
            .ok_or_else(|| SchemaError::InvariantViolation {
                expected_prefix: prefix.clone(),
                search_dir: extract_dir.clone(),
            })?;
        debug!(path = %executable.display(), "located provider executable");
        Ok(executable)
    }

    fn fetch_schema(&self, request: &ProviderRequest, executable: &Path) -> Result<ProviderSchema, SchemaError> {
        let mut client = UniversalClient::connect(self.launcher.as_ref(), executable)?;
        let generation = client.generation();
        let result = client.schema();
        client.close();
        let schema = result?;
        info!(
            namespace = %request.namespace,
            name = %request.name,
            version = %request.version,
            ?generation,
            "fetched provider schema"
        );
        Ok(schema)
    }
}

/// File name for the downloaded archive; only the final path component of the registry's name is used.
fn archive_file_name(registry_name: &str, prefix: &str, request: &ProviderRequest, platform: &Platform) -> String {
    Path::new(registry_name)
        .file_name()
        .and_then(|name| name.to_str())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("{prefix}{}_{}_{platform}.zip", request.name, request.version))
}

fn lookup<T: Clone>(
    found: Option<&T>,
    category: SchemaCategory,
    name: &str,
    request: &ProviderRequest,
) -> Result<T, SchemaError> {
    found
        .cloned()
        .ok_or_else(|| SchemaError::not_found(format!("{category} '{name}' in {request}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archive_name_keeps_only_the_file_component() {
        let request = ProviderRequest::new("hashicorp", "random", "3.6.2");
        let platform = Platform::new("linux", "amd64");
        assert_eq!(
            archive_file_name("../../etc/pkg.zip", "terraform-provider-", &request, &platform),
            "pkg.zip"
        );
        assert_eq!(
            archive_file_name("", "terraform-provider-", &request, &platform),
            "terraform-provider-random_3.6.2_linux_amd64.zip"
        );
    }
}
