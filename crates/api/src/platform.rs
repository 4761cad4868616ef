use std::env;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Operating system and CPU architecture in registry naming.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

impl Platform {
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: os.into(),
            arch: arch.into(),
        }
    }

    /// The platform this process runs on.
    pub fn host() -> Self {
        Self::new(registry_os(env::consts::OS), registry_arch(env::consts::ARCH))
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}

fn registry_os(os: &str) -> &str {
    match os {
        "macos" => "darwin",
        other => other,
    }
}

fn registry_arch(arch: &str) -> &str {
    match arch {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "x86" => "386",
        "arm" => "arm",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_rust_names_to_registry_names() {
        assert_eq!(registry_os("macos"), "darwin");
        assert_eq!(registry_os("linux"), "linux");
        assert_eq!(registry_os("windows"), "windows");
        assert_eq!(registry_arch("x86_64"), "amd64");
        assert_eq!(registry_arch("aarch64"), "arm64");
        assert_eq!(registry_arch("x86"), "386");
    }

    #[test]
    fn displays_as_os_underscore_arch() {
        assert_eq!(Platform::new("linux", "amd64").to_string(), "linux_amd64");
    }
}
