// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon process management utilities.
//!
//! Spawning, signalling, and log plumbing for the tendd child process.

use nix::sys::signal::{kill, killpg, Signal};
use nix::unistd::Pid;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::{Duration, Instant};
use tend_core::StatePaths;
use tracing::warn;

/// Grace period between SIGTERM and SIGKILL when stopping the daemon.
pub const KILL_GRACE: Duration = Duration::from_secs(5);

/// Find the tendd binary.
///
/// Order: `TEND_DAEMON_BINARY`, a sibling of the current executable, then
/// `tendd` on PATH.
pub fn find_daemon_binary() -> PathBuf {
    if let Ok(path) = std::env::var("TEND_DAEMON_BINARY") {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("tendd");
            if sibling.exists() {
                return sibling;
            }
        }
    }

    PathBuf::from("tendd")
}

/// Spawn the daemon in its own process group with stdout/stderr appended
/// to the service log files.
pub fn spawn_daemon(
    binary: &Path,
    config_path: &Path,
    paths: &StatePaths,
) -> std::io::Result<Child> {
    let stdout = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.service_log())?;
    let stderr = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(paths.error_log())?;

    Command::new(binary)
        .arg("--config")
        .arg(config_path)
        .stdin(Stdio::null())
        .stdout(stdout)
        .stderr(stderr)
        .process_group(0)
        .spawn()
}

/// Check whether a process with the given PID exists.
pub fn process_exists(pid: u32) -> bool {
    kill(Pid::from_raw(pid as i32), None).is_ok()
}

/// Send a signal to the daemon's process group.
pub fn signal_group(pid: u32, signal: Signal) -> bool {
    killpg(Pid::from_raw(pid as i32), signal).is_ok()
}

/// Terminate a child: process-group SIGTERM, grace period, SIGKILL.
///
/// Reaps the child and returns its exit code when available.
pub async fn terminate_child_group(child: &mut Child, grace: Duration) -> Option<i32> {
    let pid = child.id();
    signal_group(pid, Signal::SIGTERM);

    let start = Instant::now();
    while start.elapsed() < grace {
        match child.try_wait() {
            Ok(Some(status)) => return status.code(),
            Ok(None) => tokio::time::sleep(Duration::from_millis(100)).await,
            Err(e) => {
                warn!(error = %e, "failed to poll daemon during shutdown");
                break;
            }
        }
    }

    warn!(pid, "daemon did not stop within grace period, force-killing");
    signal_group(pid, Signal::SIGKILL);
    match child.wait() {
        Ok(status) => status.code(),
        Err(e) => {
            warn!(error = %e, "failed to reap daemon");
            None
        }
    }
}

/// Last `max_bytes` of a log file, for restart-event excerpts.
pub fn tail_of_log(path: &Path, max_bytes: usize) -> Option<String> {
    let content = std::fs::read_to_string(path).ok()?;
    let trimmed = content.trim_end();
    if trimmed.is_empty() {
        return None;
    }
    let start = trimmed.len().saturating_sub(max_bytes);
    let mut idx = start;
    while idx < trimmed.len() && !trimmed.is_char_boundary(idx) {
        idx += 1;
    }
    Some(trimmed[idx..].to_string())
}

/// Maximum log file size before rotation (10 MB).
const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Number of rotated log files to keep.
const MAX_ROTATED_LOGS: u32 = 3;

/// Rotate a log file if it exceeds [`MAX_LOG_SIZE`].
///
/// Shifts `service.log` → `service.log.1` → … → `service.log.3`, deleting
/// the oldest. Best-effort: rotation failures never block a restart.
pub fn rotate_log_if_needed(log_path: &Path) {
    let size = match std::fs::metadata(log_path) {
        Ok(m) => m.len(),
        Err(_) => return,
    };
    if size < MAX_LOG_SIZE {
        return;
    }

    let log_str = log_path.display().to_string();
    for i in (1..MAX_ROTATED_LOGS).rev() {
        let from = format!("{log_str}.{i}");
        let to = format!("{log_str}.{}", i + 1);
        let _ = std::fs::rename(&from, &to);
    }
    let _ = std::fs::rename(log_path, format!("{log_str}.1"));
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
