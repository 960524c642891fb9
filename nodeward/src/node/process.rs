//! Spawning and terminating the node child process.

use std::fs::OpenOptions;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tracing::{debug, warn};

use super::error::{NodeError, NodeResult};

/// Spawn `binary` with `args`, appending its stdout and stderr to `log_file`.
pub(crate) fn spawn_node(binary: &Path, args: &[String], log_file: &Path) -> NodeResult<Child> {
    let spawn_err = |reason: String| NodeError::SpawnFailed {
        binary: binary.display().to_string(),
        reason,
    };

    if let Some(parent) = log_file.parent() {
        std::fs::create_dir_all(parent).map_err(|e| spawn_err(e.to_string()))?;
    }
    let log = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .map_err(|e| spawn_err(format!("cannot open {}: {}", log_file.display(), e)))?;
    let log_err = log.try_clone().map_err(|e| spawn_err(e.to_string()))?;

    Command::new(binary)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::from(log))
        .stderr(Stdio::from(log_err))
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| spawn_err(e.to_string()))
}

/// Ask the child to exit, then force it after `grace`.
pub(crate) async fn terminate(child: &mut Child, grace: Duration) -> NodeResult<()> {
    if child.try_wait()?.is_some() {
        return Ok(());
    }

    request_exit(child);

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => {
            debug!(%status, "Node exited");
            Ok(())
        }
        Ok(Err(e)) => Err(NodeError::ShutdownFailed(e.to_string())),
        Err(_) => {
            warn!(grace = ?grace, "Node ignored shutdown request, killing");
            child
                .kill()
                .await
                .map_err(|e| NodeError::ShutdownFailed(e.to_string()))
        }
    }
}

#[cfg(unix)]
fn request_exit(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: plain signal delivery to a pid we own and have not reaped.
        let rc = unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) };
        if rc != 0 {
            warn!(pid, error = %std::io::Error::last_os_error(), "SIGTERM failed");
        }
    }
}

#[cfg(not(unix))]
fn request_exit(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        warn!(error = %e, "Failed to signal node");
    }
}
