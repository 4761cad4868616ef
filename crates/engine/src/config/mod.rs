//! Schema store configuration: model, loading and validation.

mod io;
mod model;

pub use io::{CONFIG_PATH_ENV, REGISTRY_ENV, default_config_path, load_config, load_config_from_path, validate_config};
pub use model::{ConfigError, HandshakeSettings, StoreConfig};
