//! Registry response bodies.

use serde::{Deserialize, Serialize};

/// Body of `GET {base}/{namespace}/{name}/versions`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VersionsResponse {
    #[serde(default)]
    pub versions: Vec<VersionEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionEntry {
    pub version: String,
}

/// Download metadata for one provider version on one platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadInfo {
    #[serde(default)]
    pub download_url: String,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
    /// Plugin protocol versions the package speaks, e.g. `["5.0", "6.0"]`.
    #[serde(default)]
    pub protocols: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_download_metadata() {
        let body = r#"{
            "protocols": ["5.0"],
            "os": "linux",
            "arch": "amd64",
            "filename": "terraform-provider-random_3.6.2_linux_amd64.zip",
            "download_url": "https://example.com/random.zip",
            "shasum": "ignored"
        }"#;
        let info: DownloadInfo = serde_json::from_str(body).unwrap();
        assert_eq!(info.filename, "terraform-provider-random_3.6.2_linux_amd64.zip");
        assert_eq!(info.protocols, vec!["5.0".to_string()]);
    }

    #[test]
    fn decodes_versions_and_ignores_extra_fields() {
        let body = r#"{"versions":[{"version":"1.0.0","protocols":["5.0"]},{"version":"1.1.0"}]}"#;
        let parsed: VersionsResponse = serde_json::from_str(body).unwrap();
        let versions: Vec<_> = parsed.versions.into_iter().map(|v| v.version).collect();
        assert_eq!(versions, vec!["1.0.0", "1.1.0"]);
    }
}
