//! Request keys identifying a provider in a registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Registry base used when neither the request nor the store configuration names one.
pub const DEFAULT_REGISTRY: &str = "https://registry.opentofu.org/v1/providers";

/// A provider to fetch, keyed by registry, namespace, name and version.
///
/// `version` may hold an exact version (`"2.5.0"`), a constraint
/// (`">=1.0.0, <2.0.0"`, `"~> 2.1"`) or be empty for "latest". Requests are
/// resolved to an exact version before they are used as cache keys. Fields are
/// case-sensitive. An empty `registry` means "the store's configured registry".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProviderRequest {
    /// Registry base URL, e.g. `https://registry.opentofu.org/v1/providers`; empty for the store default.
    #[serde(default)]
    pub registry: String,
    /// Namespace of the provider (e.g., "Azure").
    pub namespace: String,
    /// Name of the provider (e.g., "azapi").
    pub name: String,
    /// Exact version, version constraint, or empty for latest.
    #[serde(default)]
    pub version: String,
}

impl ProviderRequest {
    /// Build a request against whichever registry the store is configured for.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            registry: String::new(),
            namespace: namespace.into(),
            name: name.into(),
            version: version.into(),
        }
    }

    pub fn with_registry(mut self, registry: impl Into<String>) -> Self {
        self.registry = registry.into();
        self
    }

    /// Copy of this request pinned to an exact version.
    pub fn with_version(&self, version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            ..self.clone()
        }
    }

    /// Key for the available-versions lookup of this provider.
    pub fn versions_request(&self) -> VersionsRequest {
        VersionsRequest {
            registry: self.registry.clone(),
            namespace: self.namespace.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Display for ProviderRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)?;
        if !self.version.is_empty() {
            write!(f, "@{}", self.version)?;
        }
        Ok(())
    }
}

/// Errors parsing a `namespace/name[@version]` provider address.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseRequestError {
    #[error("provider address '{0}' must look like namespace/name[@version]")]
    InvalidAddress(String),
}

impl FromStr for ProviderRequest {
    type Err = ParseRequestError;

    /// Parse `namespace/name[@version]`; the registry is left to the store.
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let (address, version) = match trimmed.split_once('@') {
            Some((address, version)) => (address, version.trim()),
            None => (trimmed, ""),
        };
        let Some((namespace, name)) = address.split_once('/') else {
            return Err(ParseRequestError::InvalidAddress(input.to_string()));
        };
        if namespace.is_empty() || name.is_empty() || name.contains('/') {
            return Err(ParseRequestError::InvalidAddress(input.to_string()));
        }
        Ok(ProviderRequest::new(namespace, name, version))
    }
}

/// Key for the available-versions cache. An empty `registry` means the store default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VersionsRequest {
    #[serde(default)]
    pub registry: String,
    pub namespace: String,
    pub name: String,
}

impl fmt::Display for VersionsRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_address_with_constraint() {
        let request: ProviderRequest = "Azure/azapi@>=1.0.0, <2.0.0".parse().unwrap();
        assert_eq!(request.namespace, "Azure");
        assert_eq!(request.name, "azapi");
        assert_eq!(request.version, ">=1.0.0, <2.0.0");
        assert!(request.registry.is_empty());
    }

    #[test]
    fn parses_address_without_version() {
        let request: ProviderRequest = "hashicorp/random".parse().unwrap();
        assert_eq!(request.version, "");
        assert_eq!(request.to_string(), "hashicorp/random");
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!("random".parse::<ProviderRequest>().is_err());
        assert!("/random".parse::<ProviderRequest>().is_err());
        assert!("a/b/c".parse::<ProviderRequest>().is_err());
    }

    #[test]
    fn pinned_copy_keeps_identity() {
        let request = ProviderRequest::new("hashicorp", "random", "~> 3.0").with_registry("http://localhost:8080");
        let pinned = request.with_version("3.6.2");
        assert_eq!(pinned.registry, "http://localhost:8080");
        assert_eq!(pinned.version, "3.6.2");
        assert_eq!(pinned.versions_request(), request.versions_request());
        assert_ne!(pinned, request);
    }
}
