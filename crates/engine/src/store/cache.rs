//! Cache state shared by every store operation.

use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::path::PathBuf;
use std::sync::Arc;

use provschema_types::{ProviderRequest, ProviderSchema, VersionsRequest};
use semver::Version;
use tempfile::TempDir;
use tracing::{debug, info};

use crate::SchemaError;

/// Everything guarded by the store's lock.
#[derive(Debug, Default)]
pub(crate) struct Caches {
    pub(crate) downloads: HashMap<ProviderRequest, PathBuf>,
    pub(crate) schemas: HashMap<ProviderRequest, Arc<ProviderSchema>>,
    pub(crate) versions: HashMap<VersionsRequest, Vec<Version>>,
    /// Created on first download; removed by cleanup.
    pub(crate) temp_dir: Option<TempDir>,
}

impl Caches {
    pub(crate) fn clear(&mut self) {
        self.downloads.clear();
        self.schemas.clear();
        self.versions.clear();
    }
}

/// One of the maps inside [`Caches`].
pub(crate) trait CacheKind {
    type Key: Eq + Hash + Clone + Display;
    type Value: Clone;

    const NAME: &'static str;

    fn map(caches: &Caches) -> &HashMap<Self::Key, Self::Value>;
    fn map_mut(caches: &mut Caches) -> &mut HashMap<Self::Key, Self::Value>;
}

pub(crate) struct DownloadCache;
pub(crate) struct SchemaCache;
pub(crate) struct VersionsCache;

impl CacheKind for DownloadCache {
    type Key = ProviderRequest;
    type Value = PathBuf;

    const NAME: &'static str = "download";

    fn map(caches: &Caches) -> &HashMap<Self::Key, Self::Value> {
        &caches.downloads
    }
    fn map_mut(caches: &mut Caches) -> &mut HashMap<Self::Key, Self::Value> {
        &mut caches.downloads
    }
}

impl CacheKind for SchemaCache {
    type Key = ProviderRequest;
    type Value = Arc<ProviderSchema>;

    const NAME: &'static str = "schema";

    fn map(caches: &Caches) -> &HashMap<Self::Key, Self::Value> {
        &caches.schemas
    }
    fn map_mut(caches: &mut Caches) -> &mut HashMap<Self::Key, Self::Value> {
        &mut caches.schemas
    }
}

impl CacheKind for VersionsCache {
    type Key = VersionsRequest;
    type Value = Vec<Version>;

    const NAME: &'static str = "versions";

    fn map(caches: &Caches) -> &HashMap<Self::Key, Self::Value> {
        &caches.versions
    }
    fn map_mut(caches: &mut Caches) -> &mut HashMap<Self::Key, Self::Value> {
        &mut caches.versions
    }
}

/// Look up `key`, or run `create` against the already-locked state and insert its result.
///
/// `create` must not take the store lock; it may call this function again for
/// a different cache kind with the same `caches`.
pub(crate) fn get_or_create_locked<C: CacheKind>(
    caches: &mut Caches,
    key: &C::Key,
    create: impl FnOnce(&mut Caches) -> Result<C::Value, SchemaError>,
) -> Result<C::Value, SchemaError> {
    if let Some(value) = C::map(caches).get(key) {
        debug!(cache = C::NAME, %key, "cache hit");
        return Ok(value.clone());
    }
    info!(cache = C::NAME, %key, "cache miss");
    let value = create(caches)?;
    C::map_mut(caches).insert(key.clone(), value.clone());
    Ok(value)
}
