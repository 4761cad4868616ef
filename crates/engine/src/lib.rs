//! # Provschema Engine
//!
//! Resolves provider versions and retrieves provider schemas on demand.
//!
//! ## Usage
//!
//! ```no_run
//! use provschema_engine::{SchemaStore, StoreConfig};
//! use provschema_types::ProviderRequest;
//!
//! let store = SchemaStore::new(StoreConfig::default())?;
//! let request = ProviderRequest::new("hashicorp", "random", "~> 3.0");
//! let resource = store.resource_schema(&request, "random_string")?;
//! println!("{} attributes", resource.attributes.map(|a| a.len()).unwrap_or_default());
//! store.cleanup()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`version`**: version parsing, constraint matching and resolution
//! - **`config`**: store configuration file and environment overrides
//! - **`collaborators`**: registry and archive seams used by the store
//! - **`store`**: the cached download / launch / translate pipeline

pub mod collaborators;
pub mod config;
mod error;
pub mod store;
pub mod version;

pub use collaborators::{ArchiveExtractor, HttpRegistrySource, RegistrySource, ZipExtractor};
pub use config::{ConfigError, HandshakeSettings, StoreConfig, load_config, load_config_from_path, validate_config};
pub use error::SchemaError;
pub use store::SchemaStore;
pub use version::{ResolveError, VersionConstraint, VersionParseError, exact_version, parse_version, resolve_version};
