//! gRPC transport for one negotiated plugin connection.

use std::io;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::time::Duration;

use http::uri::PathAndQuery;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Child;
use tokio::time::timeout;
use tonic::codec::ProstCodec;
use tonic::transport::{Channel, Endpoint, Uri};
use tracing::{debug, info};

use provschema_util::OwnedRuntime;

use super::handshake::{Announcement, HandshakeConfig, Network, parse_announcement};
use super::protocol::SchemaRpc;
use super::stdio::{build_plugin_command, spawn_stderr_logger, spawn_stdout_drain};
use crate::types::{Generation, PluginError};
use crate::wire::SchemaMethod;

/// Largest schema response accepted from a plugin.
const MAX_DECODING_MESSAGE_SIZE: usize = 256 * 1024 * 1024;
/// Grace period for the plugin to exit after it is killed.
const EXIT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// A running plugin process with an open channel, before it is bound to a method.
pub(crate) struct PluginConnection {
    pub(crate) runtime: OwnedRuntime,
    pub(crate) child: Child,
    pub(crate) channel: Channel,
    pub(crate) generation: Generation,
    pub(crate) executable: PathBuf,
}

impl PluginConnection {
    /// Spawn `executable`, read its announcement and open the channel it names.
    pub(crate) fn open(executable: &Path, config: &HandshakeConfig, offer: &[Generation]) -> Result<Self, PluginError> {
        let runtime = OwnedRuntime::new("provschema-plugin").map_err(PluginError::Runtime)?;
        let (child, channel, generation) = runtime
            .block_on(start_plugin(executable, config, offer))
            .map_err(PluginError::Runtime)??;
        info!(path = %executable.display(), %generation, "plugin connected");
        Ok(Self {
            runtime,
            child,
            channel,
            generation,
            executable: executable.to_path_buf(),
        })
    }
}

async fn start_plugin(
    executable: &Path,
    config: &HandshakeConfig,
    offer: &[Generation],
) -> Result<(Child, Channel, Generation), PluginError> {
    let mut child = build_plugin_command(executable, config, offer)
        .spawn()
        .map_err(|source| PluginError::Spawn {
            path: executable.to_path_buf(),
            source,
        })?;
    let plugin_name = executable
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| executable.display().to_string());

    if let Some(stderr) = child.stderr.take() {
        spawn_stderr_logger(plugin_name.clone(), stderr);
    }
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| PluginError::transport("plugin stdout was not captured"))?;

    let mut lines = BufReader::new(stdout).lines();
    let line = match timeout(config.startup_timeout, lines.next_line()).await {
        Err(_) => {
            return Err(PluginError::timeout(
                "plugin handshake",
                config.startup_timeout.as_millis() as u64,
            ));
        }
        Ok(Err(error)) => return Err(PluginError::transport(format!("reading plugin handshake: {error}"))),
        Ok(Ok(None)) => return Err(PluginError::handshake("plugin exited before announcing its address")),
        Ok(Ok(Some(line))) => line,
    };
    spawn_stdout_drain(plugin_name, lines);

    let announcement = parse_announcement(&line, offer)?;
    debug!(address = %announcement.address, generation = %announcement.generation, "plugin announced");
    if announcement.server_cert.is_some() {
        return Err(PluginError::handshake("plugin requested TLS, which is not supported"));
    }
    let channel = connect_channel(&announcement, config.startup_timeout).await?;
    Ok((child, channel, announcement.generation))
}

async fn connect_channel(announcement: &Announcement, connect_timeout: Duration) -> Result<Channel, PluginError> {
    match announcement.network {
        Network::Tcp => Endpoint::from_shared(format!("http://{}", announcement.address))
            .map_err(|error| PluginError::transport(format!("invalid plugin address: {error}")))?
            .connect_timeout(connect_timeout)
            .connect()
            .await
            .map_err(|error| PluginError::transport(format!("connecting to {}: {error}", announcement.address))),
        Network::Unix => connect_unix(&announcement.address, connect_timeout).await,
    }
}

#[cfg(unix)]
async fn connect_unix(address: &str, connect_timeout: Duration) -> Result<Channel, PluginError> {
    use hyper_util::rt::TokioIo;
    use tokio::net::UnixStream;
    use tower::service_fn;

    let socket = PathBuf::from(address);
    // The URI is required by the endpoint but never dialed.
    Endpoint::try_from("http://[::]:50051")
        .map_err(|error| PluginError::transport(error.to_string()))?
        .connect_timeout(connect_timeout)
        .connect_with_connector(service_fn(move |_: Uri| {
            let socket = socket.clone();
            async move { Ok::<_, io::Error>(TokioIo::new(UnixStream::connect(socket).await?)) }
        }))
        .await
        .map_err(|error| PluginError::transport(format!("connecting to {address}: {error}")))
}

#[cfg(not(unix))]
async fn connect_unix(address: &str, _connect_timeout: Duration) -> Result<Channel, PluginError> {
    Err(PluginError::transport(format!(
        "plugin announced unix socket {address}, which this platform cannot dial"
    )))
}

/// Schema RPC over a live plugin connection for one method `M`.
pub struct GrpcSchemaRpc<M: SchemaMethod> {
    connection: Option<PluginConnection>,
    _method: PhantomData<fn() -> M>,
}

impl<M: SchemaMethod> GrpcSchemaRpc<M> {
    pub(crate) fn new(connection: PluginConnection) -> Self {
        Self {
            connection: Some(connection),
            _method: PhantomData,
        }
    }
}

impl<M: SchemaMethod> SchemaRpc for GrpcSchemaRpc<M> {
    type Response = M::Response;

    fn get_provider_schema(&mut self) -> Result<M::Response, PluginError> {
        let connection = self.connection.as_ref().ok_or(PluginError::Closed)?;
        debug!(path = M::PATH, executable = %connection.executable.display(), "calling schema rpc");
        connection
            .runtime
            .block_on(unary::<M>(connection.channel.clone()))
            .map_err(PluginError::Runtime)?
            .map_err(|status| PluginError::rpc(M::GENERATION, format!("{}: {}", status.code(), status.message())))
    }

    fn shutdown(&mut self) {
        let Some(mut connection) = self.connection.take() else {
            return;
        };
        if let Err(error) = connection.child.start_kill() {
            debug!(%error, "plugin already exited");
        }
        let child = &mut connection.child;
        let _ = connection
            .runtime
            .block_on(async { timeout(EXIT_GRACE_PERIOD, child.wait()).await });
        connection.runtime.shutdown();
        debug!(executable = %connection.executable.display(), "plugin stopped");
    }
}

impl<M: SchemaMethod> Drop for GrpcSchemaRpc<M> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn unary<M: SchemaMethod>(channel: Channel) -> Result<M::Response, tonic::Status> {
    let mut grpc = tonic::client::Grpc::new(channel).max_decoding_message_size(MAX_DECODING_MESSAGE_SIZE);
    grpc.ready()
        .await
        .map_err(|error| tonic::Status::unavailable(format!("service was not ready: {error}")))?;
    let codec = ProstCodec::<M::Request, M::Response>::default();
    let path = PathAndQuery::from_static(M::PATH);
    let response = grpc.unary(tonic::Request::new(M::Request::default()), path, codec).await?;
    Ok(response.into_inner())
}

#[cfg(all(test, unix))]
mod tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::thread;

    use super::*;
    use crate::client::MAGIC_COOKIE_VALUE;

    /// Write an executable shell script standing in for a provider plugin.
    fn write_plugin(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn quick_config() -> HandshakeConfig {
        HandshakeConfig {
            startup_timeout: Duration::from_secs(1),
            ..HandshakeConfig::default()
        }
    }

    fn open_error(executable: &Path, config: &HandshakeConfig, offer: &[Generation]) -> PluginError {
        // A freshly written script can briefly be busy while another test thread forks.
        for _ in 0..5 {
            match PluginConnection::open(executable, config, offer) {
                Ok(_) => panic!("plugin {} should not connect", executable.display()),
                Err(PluginError::Spawn { source, .. }) if source.raw_os_error() == Some(26) => {
                    thread::sleep(Duration::from_millis(50));
                }
                Err(error) => return error,
            }
        }
        panic!("plugin {} stayed busy", executable.display());
    }

    #[test]
    fn child_receives_handshake_environment() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join("env.txt");
        let plugin = write_plugin(
            dir.path(),
            "terraform-provider-env",
            &format!(
                "echo \"$TF_PLUGIN_MAGIC_COOKIE $PLUGIN_PROTOCOL_VERSIONS $PLUGIN_MIN_PORT $PLUGIN_MAX_PORT\" > {}\n\
                 echo \"2|$PLUGIN_PROTOCOL_VERSIONS|unix|/tmp/unused.sock|grpc|\"",
                env_file.display()
            ),
        );

        let error = open_error(&plugin, &quick_config(), &Generation::PREFERRED);
        assert!(matches!(error, PluginError::Handshake { .. }), "{error}");
        assert!(error.to_string().contains("core protocol version 2"), "{error}");

        let seen = fs::read_to_string(&env_file).unwrap();
        assert_eq!(seen.trim(), format!("{MAGIC_COOKIE_VALUE} 6,5 10000 25000"));
    }

    #[test]
    fn offer_of_protocol_5_only_is_advertised() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(
            dir.path(),
            "terraform-provider-offer",
            "echo \"1|6|unix|/tmp/unused.sock|grpc|\"",
        );
        let error = open_error(&plugin, &quick_config(), &[Generation::A]);
        assert!(matches!(error, PluginError::Handshake { .. }), "{error}");
        assert!(error.to_string().contains("not offered (5)"), "{error}");
    }

    #[test]
    fn plugin_exiting_before_announcement_is_a_handshake_error() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(dir.path(), "terraform-provider-quiet", "exit 0");
        let error = open_error(&plugin, &quick_config(), &Generation::PREFERRED);
        assert!(matches!(error, PluginError::Handshake { .. }), "{error}");
        assert!(error.to_string().contains("exited before announcing"), "{error}");
        assert!(error.is_transport_failure());
    }

    #[test]
    fn silent_plugin_times_out_and_is_killed() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("still-running");
        let plugin = write_plugin(
            dir.path(),
            "terraform-provider-slow",
            &format!("sleep 2\ntouch {}", marker.display()),
        );

        let error = open_error(&plugin, &quick_config(), &Generation::PREFERRED);
        assert!(matches!(error, PluginError::Timeout { timeout_ms: 1000, .. }), "{error}");
        assert!(error.is_transport_failure());

        thread::sleep(Duration::from_millis(2500));
        assert!(!marker.exists(), "plugin should be killed after a failed handshake");
    }

    #[test]
    fn tls_announcement_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(
            dir.path(),
            "terraform-provider-tls",
            "echo \"1|6|tcp|127.0.0.1:1|grpc|MIIBszCCAVmgAwIBAgIRAL\"",
        );
        let error = open_error(&plugin, &quick_config(), &Generation::PREFERRED);
        assert!(matches!(error, PluginError::Handshake { .. }), "{error}");
        assert!(error.to_string().contains("TLS"), "{error}");
    }

    #[test]
    fn unreachable_socket_is_a_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(
            dir.path(),
            "terraform-provider-nosocket",
            "echo \"1|6|unix|/nonexistent/provschema-plugin.sock|grpc|\"",
        );
        let error = open_error(&plugin, &quick_config(), &Generation::PREFERRED);
        assert!(matches!(error, PluginError::Transport { .. }), "{error}");
        assert!(error.to_string().contains("/nonexistent/provschema-plugin.sock"), "{error}");
    }

    #[test]
    fn grpc_launcher_reports_launch_failures() {
        use crate::client::{GrpcLauncher, PluginLauncher};

        let dir = tempfile::tempdir().unwrap();
        let plugin = write_plugin(dir.path(), "terraform-provider-launch", "exit 3");
        let launcher = GrpcLauncher::new(quick_config());
        let error = (0..5)
            .find_map(|_| match launcher.launch(&plugin, &Generation::PREFERRED) {
                Err(PluginError::Spawn { source, .. }) if source.raw_os_error() == Some(26) => {
                    thread::sleep(Duration::from_millis(50));
                    None
                }
                other => Some(other.unwrap_err()),
            })
            .unwrap();
        assert!(matches!(error, PluginError::Handshake { .. }), "{error}");
    }

    #[test]
    fn missing_executable_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let error = open_error(&dir.path().join("absent"), &quick_config(), &Generation::PREFERRED);
        assert!(matches!(error, PluginError::Spawn { .. }), "{error}");
    }
}
