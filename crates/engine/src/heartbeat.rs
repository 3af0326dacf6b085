// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon liveness heartbeat.
//!
//! A cooperative task that writes the current wall-clock timestamp to a
//! fixed path every interval. The supervisor reads the file's mtime; the
//! content is informational. On cancellation one final timestamp tagged
//! `SHUTDOWN` is written and the PID file is removed.

use std::path::{Path, PathBuf};
use std::time::Duration;
use tend_core::epoch_secs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default heartbeat write cadence.
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(5);

/// Marker appended to the final heartbeat on clean shutdown.
pub const SHUTDOWN_MARKER: &str = "SHUTDOWN";

/// Writes liveness timestamps for the supervisor to observe.
pub struct Heartbeat {
    heartbeat_path: PathBuf,
    pid_path: PathBuf,
    interval: Duration,
}

impl Heartbeat {
    pub fn new(heartbeat_path: PathBuf, pid_path: PathBuf, interval: Duration) -> Self {
        Self {
            heartbeat_path,
            pid_path,
            interval,
        }
    }

    fn write(&self, shutdown: bool) {
        let content = if shutdown {
            format!("{}|{}", epoch_secs(), SHUTDOWN_MARKER)
        } else {
            epoch_secs().to_string()
        };
        if let Err(e) = std::fs::write(&self.heartbeat_path, content) {
            warn!(path = %self.heartbeat_path.display(), error = %e, "failed to write heartbeat");
        } else {
            debug!("heartbeat updated");
        }
    }

    /// Run until cancellation. Writes the PID once at startup, a
    /// timestamp every interval, and a final `SHUTDOWN`-tagged timestamp
    /// on the way out.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            "starting heartbeat task",
        );

        if let Err(e) = std::fs::write(&self.pid_path, std::process::id().to_string()) {
            warn!(path = %self.pid_path.display(), error = %e, "failed to write PID file");
        }

        let mut tick = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.write(true);
                    if let Err(e) = std::fs::remove_file(&self.pid_path) {
                        warn!(error = %e, "failed to remove PID file");
                    }
                    info!("heartbeat task stopped");
                    return;
                }
                _ = tick.tick() => self.write(false),
            }
        }
    }
}

/// Age of the heartbeat file, `None` when it does not exist.
pub fn heartbeat_age(path: &Path) -> Option<Duration> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    std::time::SystemTime::now().duration_since(modified).ok()
}

/// Whether the heartbeat carries the clean-shutdown marker.
pub fn has_shutdown_marker(path: &Path) -> bool {
    std::fs::read_to_string(path)
        .map(|content| content.trim_end().ends_with(SHUTDOWN_MARKER))
        .unwrap_or(false)
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
