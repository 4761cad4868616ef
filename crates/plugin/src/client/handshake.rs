//! Plugin process handshake: environment contract and the stdout announcement line.

use std::time::Duration;

use crate::types::{Generation, PluginError};

/// Environment key carrying the handshake secret.
pub const MAGIC_COOKIE_KEY: &str = "TF_PLUGIN_MAGIC_COOKIE";
/// Handshake secret expected by provider plugins.
pub const MAGIC_COOKIE_VALUE: &str = "d602bf8f470bc67ca7faa0386276bbdd4330efaf76d1a219cb4d6991ca9872b2";

const CORE_PROTOCOL_VERSION: &str = "1";
const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(60);
const DEFAULT_MIN_PORT: u16 = 10_000;
const DEFAULT_MAX_PORT: u16 = 25_000;

/// Settings handed to a plugin process at launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandshakeConfig {
    pub magic_cookie_key: String,
    pub magic_cookie_value: String,
    /// How long to wait for the announcement line.
    pub startup_timeout: Duration,
    pub min_port: u16,
    pub max_port: u16,
}

impl Default for HandshakeConfig {
    fn default() -> Self {
        Self {
            magic_cookie_key: MAGIC_COOKIE_KEY.to_string(),
            magic_cookie_value: MAGIC_COOKIE_VALUE.to_string(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            min_port: DEFAULT_MIN_PORT,
            max_port: DEFAULT_MAX_PORT,
        }
    }
}

impl HandshakeConfig {
    /// Environment variables advertising `offer` to the plugin.
    pub fn environment(&self, offer: &[Generation]) -> Vec<(String, String)> {
        let versions = offer
            .iter()
            .map(|generation| generation.protocol_version().to_string())
            .collect::<Vec<_>>()
            .join(",");
        vec![
            (self.magic_cookie_key.clone(), self.magic_cookie_value.clone()),
            ("PLUGIN_PROTOCOL_VERSIONS".to_string(), versions),
            ("PLUGIN_MIN_PORT".to_string(), self.min_port.to_string()),
            ("PLUGIN_MAX_PORT".to_string(), self.max_port.to_string()),
        ]
    }
}

/// Transport the plugin listens on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    Unix,
    Tcp,
}

/// Parsed `CORE|APP|NETWORK|ADDRESS|PROTOCOL[|CERT]` announcement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub generation: Generation,
    pub network: Network,
    pub address: String,
    /// Base64 server certificate when the plugin negotiated TLS.
    pub server_cert: Option<String>,
}

/// Parse the plugin's announcement line and check it against `offer`.
pub fn parse_announcement(line: &str, offer: &[Generation]) -> Result<Announcement, PluginError> {
    let line = line.trim();
    let parts: Vec<&str> = line.split('|').collect();
    if parts.len() < 4 {
        return Err(PluginError::handshake(format!("unrecognized announcement line: '{line}'")));
    }

    if parts[0] != CORE_PROTOCOL_VERSION {
        return Err(PluginError::handshake(format!(
            "incompatible core protocol version {}; expected {CORE_PROTOCOL_VERSION}",
            parts[0]
        )));
    }

    let generation = parts[1]
        .parse::<u32>()
        .ok()
        .and_then(Generation::from_protocol_version)
        .filter(|generation| offer.contains(generation))
        .ok_or_else(|| {
            PluginError::handshake(format!(
                "plugin selected protocol version '{}' which was not offered ({})",
                parts[1],
                offer.iter().map(|g| g.protocol_version().to_string()).collect::<Vec<_>>().join(",")
            ))
        })?;

    let network = match parts[2] {
        "unix" => Network::Unix,
        "tcp" => Network::Tcp,
        other => return Err(PluginError::handshake(format!("unsupported network type '{other}'"))),
    };

    let protocol = parts.get(4).copied().unwrap_or("netrpc");
    if protocol != "grpc" {
        return Err(PluginError::handshake(format!("unsupported plugin protocol '{protocol}'; expected grpc")));
    }

    let server_cert = parts.get(5).filter(|cert| !cert.is_empty()).map(|cert| cert.to_string());

    Ok(Announcement {
        generation,
        network,
        address: parts[3].to_string(),
        server_cert,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_unix_grpc_announcement() {
        let announcement = parse_announcement("1|6|unix|/tmp/plugin123|grpc|\n", &Generation::PREFERRED).unwrap();
        assert_eq!(announcement.generation, Generation::B);
        assert_eq!(announcement.network, Network::Unix);
        assert_eq!(announcement.address, "/tmp/plugin123");
        assert_eq!(announcement.server_cert, None);
    }

    #[test]
    fn accepts_tcp_with_certificate() {
        let announcement = parse_announcement("1|5|tcp|127.0.0.1:10001|grpc|MIIB", &[Generation::A]).unwrap();
        assert_eq!(announcement.generation, Generation::A);
        assert_eq!(announcement.network, Network::Tcp);
        assert_eq!(announcement.server_cert.as_deref(), Some("MIIB"));
    }

    #[test]
    fn rejects_wrong_core_version() {
        let err = parse_announcement("2|6|unix|/tmp/x|grpc|", &Generation::PREFERRED).unwrap_err();
        assert!(err.to_string().contains("core protocol"), "{err}");
    }

    #[test]
    fn rejects_non_grpc_protocols() {
        assert!(parse_announcement("1|6|unix|/tmp/x|netrpc|", &Generation::PREFERRED).is_err());
        assert!(parse_announcement("1|6|unix|/tmp/x", &Generation::PREFERRED).is_err());
    }

    #[test]
    fn rejects_generation_that_was_not_offered() {
        let err = parse_announcement("1|6|unix|/tmp/x|grpc|", &[Generation::A]).unwrap_err();
        assert!(matches!(err, PluginError::Handshake { .. }));
        assert!(parse_announcement("1|4|unix|/tmp/x|grpc|", &Generation::PREFERRED).is_err());
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_announcement("hello world", &Generation::PREFERRED).is_err());
        assert!(parse_announcement("1|6|udp|x|grpc|", &Generation::PREFERRED).is_err());
    }

    #[test]
    fn environment_lists_offered_versions_in_order() {
        let env = HandshakeConfig::default().environment(&Generation::PREFERRED);
        assert!(env.contains(&(MAGIC_COOKIE_KEY.to_string(), MAGIC_COOKIE_VALUE.to_string())));
        assert!(env.contains(&("PLUGIN_PROTOCOL_VERSIONS".to_string(), "6,5".to_string())));
        assert!(env.contains(&("PLUGIN_MIN_PORT".to_string(), "10000".to_string())));
    }
}
