// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The watchdog: an outer process that keeps the daemon alive.
//!
//! Spawns tendd as a child in its own process group with logs redirected
//! to files, then checks liveness every `check_interval`: a dead child is
//! respawned under exponential backoff; a live child whose heartbeat file
//! has gone stale is process-group-killed and respawned. Every decision
//! appends a restart event and updates the singleton watchdog state in
//! the supervisor's own store.

use crate::backoff::restart_delay;
use crate::daemon_process::{
    find_daemon_binary, rotate_log_if_needed, spawn_daemon, tail_of_log, terminate_child_group,
    KILL_GRACE,
};
use std::path::{Path, PathBuf};
use std::process::Child;
use std::time::Duration;
use tend_core::{epoch_secs, Config, ConfigError, RestartReason, StatePaths, WatchdogState};
use tend_engine::heartbeat_age;
use tend_storage::{Store, StoreError};
use thiserror::Error;
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info, warn};

/// How many bytes of the error log travel with a restart event.
const LOG_EXCERPT_BYTES: usize = 2048;

/// Errors that abort the supervisor
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// The supervisor process state.
pub struct Supervisor {
    paths: StatePaths,
    config_path: PathBuf,
    config: Config,
    store: Store,
    daemon_binary: PathBuf,
    child: Option<Child>,
    restart_count: u32,
    last_restart_secs: u64,
}

impl Supervisor {
    /// Build the supervisor against the default state directory.
    pub fn new(config_override: Option<PathBuf>) -> Result<Self, SupervisorError> {
        let paths = StatePaths::resolve()?;
        let config_path = config_override.unwrap_or_else(|| paths.config());
        Self::with_paths(paths, config_path)
    }

    /// Build the supervisor against an explicit state directory.
    pub fn with_paths(paths: StatePaths, config_path: PathBuf) -> Result<Self, SupervisorError> {
        std::fs::create_dir_all(&paths.data_dir)?;
        let config = Config::load_or_init(&config_path)?;
        let store = Store::open(&paths.data_dir, "watchdog")?;

        // Resume restart bookkeeping from previous supervisor lifetimes
        let state = store.read_watchdog_state();
        if state.restart_count > 0 {
            info!(
                restart_count = state.restart_count,
                "resuming watchdog state from store",
            );
        }

        Ok(Self {
            paths,
            config_path,
            config,
            store,
            daemon_binary: find_daemon_binary(),
            child: None,
            restart_count: state.restart_count,
            last_restart_secs: state.last_restart_secs,
        })
    }

    fn check_interval(&self) -> Duration {
        Duration::from_secs(self.config.watchdog.check_interval.max(1))
    }

    /// Stale threshold: three missed check intervals.
    fn heartbeat_grace_secs(&self) -> u64 {
        self.config.watchdog.check_interval.max(1) * 3
    }

    fn persist_state(&mut self, is_running: bool) {
        let state = WatchdogState {
            restart_count: self.restart_count,
            last_restart_secs: self.last_restart_secs,
            is_running,
        };
        if let Err(e) = self.store.write_watchdog_state(state) {
            error!(error = %e, "failed to persist watchdog state");
        }
    }

    fn record_event(&mut self, reason: RestartReason, exit_code: Option<i32>, excerpt: bool) {
        let log_excerpt = if excerpt {
            tail_of_log(&self.paths.error_log(), LOG_EXCERPT_BYTES)
        } else {
            None
        };
        if let Err(e) = self.store.append_restart_event(reason, exit_code, log_excerpt) {
            error!(error = %e, "failed to append restart event");
        }
    }

    /// Spawn the daemon and record the start.
    fn start_daemon(&mut self) {
        rotate_log_if_needed(&self.paths.service_log());
        rotate_log_if_needed(&self.paths.error_log());

        match spawn_daemon(&self.daemon_binary, &self.config_path, &self.paths) {
            Ok(child) => {
                info!(pid = child.id(), "started daemon process");
                self.child = Some(child);
                self.restart_count += 1;
                self.last_restart_secs = epoch_secs();
                self.record_event(RestartReason::Start, None, false);
                self.persist_state(true);
            }
            Err(e) => {
                error!(error = %e, binary = %self.daemon_binary.display(), "failed to start daemon");
                self.record_event(RestartReason::StartFailed, None, false);
            }
        }
    }

    /// Reap the child if it has exited, returning its exit code.
    fn child_exit(&mut self) -> Option<Option<i32>> {
        match &mut self.child {
            None => Some(None),
            Some(child) => match child.try_wait() {
                Ok(Some(status)) => {
                    self.child = None;
                    Some(status.code())
                }
                Ok(None) => None,
                Err(e) => {
                    warn!(error = %e, "failed to poll daemon process");
                    None
                }
            },
        }
    }

    /// One liveness check: restart a dead child (under backoff), or kill
    /// and restart a hung one.
    async fn check(&mut self) {
        if let Some(exit_code) = self.child_exit() {
            let max = self.config.watchdog.max_restart_attempts;
            if max > 0 && self.restart_count >= max {
                warn!(max, "max restart attempts reached, not restarting");
                return;
            }

            let delay = restart_delay(self.restart_count);
            let since = epoch_secs().saturating_sub(self.last_restart_secs);
            if self.restart_count > 0 && since < delay.as_secs() {
                info!(
                    wait_secs = delay.as_secs() - since,
                    "waiting before restart (backoff)",
                );
                return;
            }

            warn!(?exit_code, "daemon process not running, restarting");
            self.record_event(RestartReason::ExitNonzero, exit_code, true);
            self.start_daemon();
            return;
        }

        // Child is running; a stale heartbeat means it is hung
        if is_heartbeat_stale(
            &self.paths.heartbeat(),
            self.last_restart_secs,
            self.heartbeat_grace_secs(),
        ) {
            warn!("daemon heartbeat is stale, killing and restarting");
            if let Some(mut child) = self.child.take() {
                terminate_child_group(&mut child, KILL_GRACE).await;
            }
            self.record_event(RestartReason::HeartbeatStale, None, true);
            self.start_daemon();
        }
    }

    /// Graceful shutdown: terminate the child, mark not-running, compact
    /// the store.
    async fn shutdown(&mut self) {
        if let Some(mut child) = self.child.take() {
            info!(pid = child.id(), "terminating daemon process");
            terminate_child_group(&mut child, KILL_GRACE).await;
        }
        self.persist_state(false);
        if let Err(e) = self.store.checkpoint() {
            warn!(error = %e, "failed to checkpoint watchdog store");
        }
    }

    /// Run the supervisor foreground loop until SIGINT/SIGTERM.
    pub async fn run(mut self) -> Result<(), SupervisorError> {
        info!(
            binary = %self.daemon_binary.display(),
            check_interval_secs = self.check_interval().as_secs(),
            "starting supervisor",
        );

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        self.start_daemon();

        let mut tick = tokio::time::interval(self.check_interval());
        tick.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                _ = tick.tick() => self.check().await,
                _ = sigint.recv() => {
                    info!("received SIGINT, shutting down");
                    break;
                }
                _ = sigterm.recv() => {
                    info!("received SIGTERM, shutting down");
                    break;
                }
            }
        }

        self.shutdown().await;
        info!("supervisor stopped");
        Ok(())
    }
}

/// Whether the heartbeat indicates a hung daemon.
///
/// A missing heartbeat file only counts as stale once the daemon has had
/// the full grace window since its last start; the file does not exist
/// until the first heartbeat write.
pub fn is_heartbeat_stale(heartbeat: &Path, last_restart_secs: u64, grace_secs: u64) -> bool {
    match heartbeat_age(heartbeat) {
        Some(age) => age.as_secs() > grace_secs,
        None => epoch_secs().saturating_sub(last_restart_secs) > grace_secs,
    }
}

#[cfg(test)]
#[path = "supervisor_tests.rs"]
mod tests;
