//! Process helpers for provider plugins.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader, Lines};
use tokio::process::{ChildStderr, ChildStdout, Command};
use tracing::debug;

use super::handshake::HandshakeConfig;
use crate::types::Generation;

/// Build a configured `tokio::process::Command` for a plugin executable.
pub(crate) fn build_plugin_command(executable: &Path, config: &HandshakeConfig, offer: &[Generation]) -> Command {
    let mut cmd = Command::new(executable);
    for (key, value) in config.environment(offer) {
        cmd.env(key, value);
    }
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// Spawn a background task that forwards stderr lines to tracing.
pub(crate) fn spawn_stderr_logger(plugin_name: String, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(plugin = %plugin_name, "{line}");
        }
    });
}

/// Keep draining stdout after the announcement so the plugin never blocks on a full pipe.
pub(crate) fn spawn_stdout_drain(plugin_name: String, mut lines: Lines<BufReader<ChildStdout>>) {
    tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            debug!(plugin = %plugin_name, stream = "stdout", "{line}");
        }
    });
}
