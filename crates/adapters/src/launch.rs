// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Remote worker launching over a remote shell.

use async_trait::async_trait;
use rfarm_core::HostName;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;

/// How long a remote-shell invocation may run before we stop watching it.
pub const LAUNCH_TIMEOUT: Duration = Duration::from_secs(120);

/// Database shipping details for convert-provisioned hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConvert {
    pub local_db: PathBuf,
    pub remote_db: PathBuf,
}

/// One request to start a worker on a remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRequest {
    pub host: HostName,
    /// Address the new worker should dial back to.
    pub controller: String,
    pub port: u16,
    pub remote_dir: PathBuf,
    /// Present when the database must be converted and shipped first.
    pub convert: Option<DbConvert>,
}

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("failed to spawn {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },
}

/// Starts workers on remote hosts.
///
/// Implementations must not block the caller on the remote process itself:
/// the launched worker announces itself by dialing the controller back, and
/// launch failures only get logged.
#[async_trait]
pub trait HostLauncher: Send + Sync {
    async fn launch(&self, request: LaunchRequest) -> Result<(), LaunchError>;
}

/// Launcher that drives an `rsh`-style remote shell binary.
pub struct RshLauncher {
    shell: String,
    worker_cmd: String,
    export_cmd: String,
    import_cmd: String,
}

impl RshLauncher {
    pub fn new(shell: impl Into<String>) -> Self {
        Self {
            shell: shell.into(),
            worker_cmd: "rfarmw".to_string(),
            export_cmd: "gdump".to_string(),
            import_cmd: "gload".to_string(),
        }
    }

    /// Command line executed on the remote host.
    fn remote_script(&self, request: &LaunchRequest) -> String {
        let dir = request.remote_dir.display();
        let run = format!(
            "exec {} {} {}",
            self.worker_cmd, request.controller, request.port
        );
        match &request.convert {
            // The converted database arrives on stdin, piped through the
            // remote shell.
            Some(convert) => format!(
                "cd {dir} && {} {} && {run}",
                self.import_cmd,
                convert.remote_db.display()
            ),
            None => format!("cd {dir} && {run}"),
        }
    }
}

#[async_trait]
impl HostLauncher for RshLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<(), LaunchError> {
        let remote = self.remote_script(&request);
        let (program, args) = match &request.convert {
            Some(convert) => (
                "sh".to_string(),
                vec![
                    "-c".to_string(),
                    format!(
                        "{} {} | {} {} {}",
                        self.export_cmd,
                        shell_quote(&convert.local_db.display().to_string()),
                        self.shell,
                        request.host,
                        shell_quote(&remote)
                    ),
                ],
            ),
            None => (
                self.shell.clone(),
                vec![request.host.to_string(), "-n".to_string(), remote],
            ),
        };

        let mut command = Command::new(&program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        let mut child = command.spawn().map_err(|source| LaunchError::Spawn {
            command: program.clone(),
            source,
        })?;

        // Fire and forget: watch the child in the background so a failed
        // remote start shows up in the log without blocking the caller.
        let host = request.host.clone();
        tokio::spawn(async move {
            match tokio::time::timeout(LAUNCH_TIMEOUT, child.wait()).await {
                Ok(Ok(status)) if status.success() => {
                    tracing::debug!(host = %host, "remote launch command finished");
                }
                Ok(Ok(status)) => {
                    tracing::warn!(host = %host, %status, "remote launch command failed");
                }
                Ok(Err(e)) => {
                    tracing::warn!(host = %host, error = %e, "remote launch command errored");
                }
                Err(_) => {
                    tracing::debug!(
                        host = %host,
                        "remote launch command still running after {}s, no longer watching",
                        LAUNCH_TIMEOUT.as_secs()
                    );
                }
            }
        });
        Ok(())
    }
}

/// Minimal single-quote shell escaping.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "'\\''"))
}

/// Fake launcher recording requests for tests.
#[cfg(any(test, feature = "test-support"))]
#[derive(Clone, Default)]
pub struct FakeLauncher {
    inner: std::sync::Arc<parking_lot::Mutex<Vec<LaunchRequest>>>,
}

#[cfg(any(test, feature = "test-support"))]
impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded launch requests.
    pub fn requests(&self) -> Vec<LaunchRequest> {
        self.inner.lock().clone()
    }
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl HostLauncher for FakeLauncher {
    async fn launch(&self, request: LaunchRequest) -> Result<(), LaunchError> {
        self.inner.lock().push(request);
        Ok(())
    }
}

#[cfg(test)]
#[path = "launch_tests.rs"]
mod tests;
