//! Provider registry client.
//!
//! This crate wraps the three registry calls the schema store needs:
//!
//! - listing the published versions of a provider
//! - fetching download metadata for one version on one [`Platform`]
//! - streaming the package archive to disk
//!
//! Registry base URLs travel with each request, so a single
//! [`RegistryClient`] can serve several registries. Every base URL is checked
//! by [`validate_base_url`] before it is used.
//!
//! # Example
//!
//! ```ignore
//! use provschema_api::{Platform, RegistryClient};
//! use std::time::Duration;
//!
//! async fn latest(client: &RegistryClient) -> Result<(), provschema_api::RegistryError> {
//!     let base = "https://registry.opentofu.org/v1/providers";
//!     let versions = client.list_versions(base, "hashicorp", "random").await?;
//!     let info = client
//!         .download_info(base, "hashicorp", "random", &versions[0], &Platform::host())
//!         .await?;
//!     println!("{}", info.download_url);
//!     Ok(())
//! }
//! ```

mod error;
mod models;
mod platform;

use std::env;
use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, StatusCode, Url, header};
use tokio::io::AsyncWriteExt;
use tracing::debug;

pub use error::RegistryError;
pub use models::{DownloadInfo, VersionEntry, VersionsResponse};
pub use platform::Platform;

/// Hostnames allowed to use plain HTTP.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Default timeout applied to every registry request.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for registry access.
pub struct RegistryClient {
    pub http: Client,
    pub user_agent: String,
}

impl RegistryClient {
    pub fn new(timeout: Duration) -> Result<Self, RegistryError> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(timeout)
            .build()
            .map_err(|source| RegistryError::transport("<client>", source))?;

        Ok(Self {
            http,
            user_agent: format!("provschema/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS),
        })
    }

    /// Build a GET request carrying the configured User-Agent.
    fn get(&self, url: &str) -> RequestBuilder {
        debug!(%url, "building request");
        self.http.get(url).header(header::USER_AGENT, &self.user_agent)
    }

    /// Published versions of `namespace/name`, in registry order.
    pub async fn list_versions(&self, base: &str, namespace: &str, name: &str) -> Result<Vec<String>, RegistryError> {
        let url = versions_url(base, namespace, name)?;
        let body: VersionsResponse = self.get_json(&url).await?;
        Ok(body.versions.into_iter().map(|entry| entry.version).collect())
    }

    /// Download metadata for an exact version on `platform`.
    pub async fn download_info(
        &self,
        base: &str,
        namespace: &str,
        name: &str,
        version: &str,
        platform: &Platform,
    ) -> Result<DownloadInfo, RegistryError> {
        let url = download_info_url(base, namespace, name, version, platform)?;
        let info: DownloadInfo = self.get_json(&url).await?;
        if info.download_url.is_empty() {
            return Err(RegistryError::MissingDownloadUrl { url });
        }
        Ok(info)
    }

    /// Stream the archive at `url` into `destination`, returning the byte count.
    pub async fn download(&self, url: &str, destination: &Path) -> Result<u64, RegistryError> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|source| RegistryError::transport(url, source))?;
        if response.status() != StatusCode::OK {
            return Err(RegistryError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| RegistryError::io(destination, e))?;
        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|source| RegistryError::transport(url, source))?;
            file.write_all(&chunk).await.map_err(|e| RegistryError::io(destination, e))?;
            written += chunk.len() as u64;
        }
        file.flush().await.map_err(|e| RegistryError::io(destination, e))?;
        debug!(%url, path = %destination.display(), bytes = written, "downloaded archive");
        Ok(written)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, RegistryError> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|source| RegistryError::transport(url, source))?;
        match response.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(RegistryError::NotFound { url: url.to_string() }),
            status => {
                return Err(RegistryError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|source| RegistryError::transport(url, source))?;
        serde_json::from_slice(&bytes).map_err(|e| RegistryError::Decode {
            url: url.to_string(),
            reason: e.to_string(),
        })
    }
}

/// `{base}/{namespace}/{name}/versions`
pub fn versions_url(base: &str, namespace: &str, name: &str) -> Result<String, RegistryError> {
    validate_base_url(base)?;
    Ok(format!("{}/{}/{}/versions", base.trim_end_matches('/'), namespace, name))
}

/// `{base}/{namespace}/{name}/{version}/download/{os}/{arch}`
pub fn download_info_url(
    base: &str,
    namespace: &str,
    name: &str,
    version: &str,
    platform: &Platform,
) -> Result<String, RegistryError> {
    validate_base_url(base)?;
    Ok(format!(
        "{}/{}/{}/{}/download/{}/{}",
        base.trim_end_matches('/'),
        namespace,
        name,
        version,
        platform.os,
        platform.arch
    ))
}

/// Validate that a registry base URL is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS
pub fn validate_base_url(base: &str) -> Result<(), RegistryError> {
    let invalid = |reason: String| RegistryError::InvalidBaseUrl {
        url: base.to_string(),
        reason,
    };
    let parsed = Url::parse(base).map_err(|e| invalid(e.to_string()))?;
    let host_name = parsed
        .host_str()
        .ok_or_else(|| invalid("registry URL must include a host".into()))?;

    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        return Err(invalid(format!(
            "must use https for non-localhost hosts; got '{}://'",
            parsed.scheme()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    /// Serve exactly one HTTP response on a loopback port; returns the base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://127.0.0.1:{}/v1/providers", addr.port())
    }

    fn client() -> RegistryClient {
        RegistryClient::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn builds_registry_urls() {
        let base = "https://registry.opentofu.org/v1/providers/";
        assert_eq!(
            versions_url(base, "hashicorp", "random").unwrap(),
            "https://registry.opentofu.org/v1/providers/hashicorp/random/versions"
        );
        assert_eq!(
            download_info_url(base, "hashicorp", "random", "3.6.2", &Platform::new("darwin", "arm64")).unwrap(),
            "https://registry.opentofu.org/v1/providers/hashicorp/random/3.6.2/download/darwin/arm64"
        );
    }

    #[test]
    fn rejects_plain_http_for_remote_hosts() {
        assert!(validate_base_url("https://registry.example.com/v1/providers").is_ok());
        assert!(validate_base_url("http://localhost:8080/v1/providers").is_ok());
        assert!(validate_base_url("http://127.0.0.1/v1").is_ok());
        assert!(matches!(
            validate_base_url("http://registry.example.com"),
            Err(RegistryError::InvalidBaseUrl { .. })
        ));
        assert!(validate_base_url("not a url").is_err());
    }

    #[tokio::test]
    async fn lists_versions_from_registry() {
        let base = serve_once("200 OK", r#"{"versions":[{"version":"0.1.0"},{"version":"0.2.0"}]}"#).await;
        let versions = client().list_versions(&base, "acme", "widget").await.unwrap();
        assert_eq!(versions, vec!["0.1.0", "0.2.0"]);
    }

    #[tokio::test]
    async fn missing_provider_is_not_found() {
        let base = serve_once("404 Not Found", "").await;
        let err = client().list_versions(&base, "acme", "missing").await.unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[tokio::test]
    async fn server_errors_carry_the_status() {
        let base = serve_once("503 Service Unavailable", "").await;
        let err = client().list_versions(&base, "acme", "widget").await.unwrap_err();
        assert!(matches!(err, RegistryError::Status { status: 503, .. }));
    }

    #[tokio::test]
    async fn malformed_body_is_a_decode_error() {
        let base = serve_once("200 OK", "{not json").await;
        let err = client().list_versions(&base, "acme", "widget").await.unwrap_err();
        assert!(matches!(err, RegistryError::Decode { .. }));
    }

    #[tokio::test]
    async fn empty_download_url_is_rejected() {
        let base = serve_once("200 OK", r#"{"download_url":"","filename":"x.zip"}"#).await;
        let err = client()
            .download_info(&base, "acme", "widget", "1.0.0", &Platform::new("linux", "amd64"))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistryError::MissingDownloadUrl { .. }));
    }

    #[tokio::test]
    async fn downloads_archive_to_disk() {
        let base = serve_once("200 OK", "zip-bytes").await;
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("pkg.zip");
        let written = client().download(&format!("{base}/pkg.zip"), &target).await.unwrap();
        assert_eq!(written, 9);
        assert_eq!(std::fs::read_to_string(target).unwrap(), "zip-bytes");
    }
}
