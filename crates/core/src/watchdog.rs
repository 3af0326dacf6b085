// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Supervisor restart bookkeeping types

use serde::{Deserialize, Serialize};

/// Why the supervisor (re)started or failed to start the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartReason {
    /// Daemon was spawned.
    Start,
    /// Daemon process exited (exit code recorded).
    ExitNonzero,
    /// Heartbeat file went stale; daemon was killed and respawned.
    HeartbeatStale,
    /// Spawning the daemon failed.
    StartFailed,
}

impl std::fmt::Display for RestartReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RestartReason::Start => write!(f, "start"),
            RestartReason::ExitNonzero => write!(f, "exit_nonzero"),
            RestartReason::HeartbeatStale => write!(f, "heartbeat_stale"),
            RestartReason::StartFailed => write!(f, "start_failed"),
        }
    }
}

/// Append-only record of a restart decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestartEvent {
    pub at_ms: u64,
    pub reason: RestartReason,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    /// Tail of the daemon's error log at decision time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_excerpt: Option<String>,
}

/// Singleton supervisor state, persisted across supervisor lifetimes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatchdogState {
    /// Total daemon starts, monotonically non-decreasing.
    pub restart_count: u32,
    /// Epoch seconds of the most recent daemon start.
    pub last_restart_secs: u64,
    pub is_running: bool,
}
