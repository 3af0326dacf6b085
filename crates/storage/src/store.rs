// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed store over WAL + snapshot + materialized state.
//!
//! Two stores exist at runtime, each single-writer: `service` (owned by
//! the daemon) and `watchdog` (owned by the supervisor). Every typed
//! operation appends its events and flushes them to disk before mutating
//! the in-memory state, so durability precedes visibility. Multi-event
//! operations flush once and commit together.

use crate::snapshot::{Snapshot, SnapshotError};
use crate::state::MaterializedState;
use crate::wal::{Wal, WalError};
use std::path::{Path, PathBuf};
use tend_core::{
    bound_adapter_log, epoch_ms, Ecosystem, Event, PackageAction, PackageRecord, RestartEvent,
    RestartReason, Task, TaskId, TaskStatus, TrackedFile, WatchdogState,
};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that can occur in store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// The on-disk state cannot be interpreted; the daemon treats this as
    /// fatal.
    #[error("corrupt store state: {0}")]
    CorruptState(String),
    #[error("unknown task: {0}")]
    UnknownTask(String),
    #[error("illegal task transition for {id}: {from} → {to}")]
    IllegalTransition {
        id: String,
        from: TaskStatus,
        to: TaskStatus,
    },
}

impl From<WalError> for StoreError {
    fn from(err: WalError) -> Self {
        match err {
            WalError::Io(e) => StoreError::Io(e),
            other => StoreError::CorruptState(other.to_string()),
        }
    }
}

impl From<SnapshotError> for StoreError {
    fn from(err: SnapshotError) -> Self {
        match err {
            SnapshotError::Io(e) => StoreError::Io(e),
            other => StoreError::CorruptState(other.to_string()),
        }
    }
}

/// Embedded durable store: WAL + snapshot + materialized state.
pub struct Store {
    wal: Wal,
    state: MaterializedState,
    snapshot_path: PathBuf,
}

impl Store {
    /// Open (or create) the named store under `dir`.
    ///
    /// Loads `<name>.snapshot` if present and replays `<name>.wal` entries
    /// past its sequence number. Parse or schema failures surface as
    /// [`StoreError::CorruptState`].
    pub fn open(dir: &Path, name: &str) -> Result<Self, StoreError> {
        let snapshot_path = dir.join(format!("{name}.snapshot"));
        let wal_path = dir.join(format!("{name}.wal"));

        let (mut state, processed_seq) = match Snapshot::load(&snapshot_path)? {
            Some(snapshot) => (snapshot.state, snapshot.seq),
            None => (MaterializedState::default(), 0),
        };

        let mut wal = Wal::open(&wal_path, processed_seq)?;
        let entries = wal.entries_after(processed_seq)?;
        let replayed = entries.len();
        for entry in entries {
            state.apply_event(&entry.event);
            wal.mark_processed(entry.seq);
        }
        if replayed > 0 {
            info!(store = name, entries = replayed, "replayed WAL entries");
        }

        Ok(Self {
            wal,
            state,
            snapshot_path,
        })
    }

    /// Read-only view of the materialized state.
    pub fn state(&self) -> &MaterializedState {
        &self.state
    }

    /// Durably append `events`, then apply them to in-memory state.
    fn commit(&mut self, events: Vec<Event>) -> Result<(), StoreError> {
        let mut last_seq = 0;
        for event in &events {
            last_seq = self.wal.append(event)?;
        }
        // Single fsync covers the whole batch; a crash before this point
        // rolls the batch back entirely.
        self.wal.flush()?;
        for event in &events {
            self.state.apply_event(event);
        }
        self.wal.mark_processed(last_seq);
        Ok(())
    }

    // -- tasks --

    /// Persist a new pending task. The pending row is durable before this
    /// returns, so a crash between enqueue and processing preserves the
    /// work.
    pub fn upsert_task(&mut self, task: &Task) -> Result<(), StoreError> {
        self.commit(vec![Event::TaskEnqueued {
            id: task.id.clone(),
            path: task.path.clone(),
            ecosystem: task.ecosystem,
            created_at_ms: task.created_at_ms,
        }])
    }

    /// Advance a task's status, recording an optional error string.
    pub fn advance_task_status(
        &mut self,
        id: &TaskId,
        status: TaskStatus,
        error: Option<String>,
    ) -> Result<(), StoreError> {
        let current = self
            .state
            .get_task(id.as_str())
            .ok_or_else(|| StoreError::UnknownTask(id.as_str().to_string()))?
            .status;
        if !current.can_advance_to(status) {
            return Err(StoreError::IllegalTransition {
                id: id.as_str().to_string(),
                from: current,
                to: status,
            });
        }
        self.commit(vec![Event::TaskStatusChanged {
            id: id.clone(),
            status,
            error,
            at_ms: epoch_ms(),
        }])
    }

    /// Pending tasks ordered by creation time, up to `limit`.
    pub fn list_pending_tasks(&self, limit: usize) -> Vec<Task> {
        self.state.pending_tasks(limit)
    }

    /// Resurrect tasks interrupted mid-processing by a crash.
    ///
    /// Policy: `processing` tasks found at startup return to `pending` and
    /// are re-run; reconciliation is idempotent so the retry is safe.
    pub fn recover_interrupted_tasks(&mut self) -> Result<Vec<TaskId>, StoreError> {
        let interrupted = self.state.processing_tasks();
        if interrupted.is_empty() {
            return Ok(Vec::new());
        }
        let at_ms = epoch_ms();
        let events = interrupted
            .iter()
            .map(|t| Event::TaskStatusChanged {
                id: t.id.clone(),
                status: TaskStatus::Pending,
                error: None,
                at_ms,
            })
            .collect();
        self.commit(events)?;
        let ids: Vec<TaskId> = interrupted.into_iter().map(|t| t.id).collect();
        warn!(
            count = ids.len(),
            "recovered interrupted tasks back to pending"
        );
        Ok(ids)
    }

    // -- tracked files --

    /// Record (or refresh) a tracked manifest file.
    pub fn record_tracked_file(&mut self, file: &TrackedFile) -> Result<(), StoreError> {
        self.commit(vec![Event::FileTracked {
            path: file.path.clone(),
            mtime_ms: file.mtime_ms,
            processed_at_ms: file.processed_at_ms,
            ecosystem: file.ecosystem,
        }])
    }

    /// Remove a tracked file whose path disappeared from the filesystem.
    pub fn purge_tracked_file(&mut self, path: &Path) -> Result<(), StoreError> {
        if !self.state.tracked_files.contains_key(path) {
            debug!(path = %path.display(), "purge of untracked file ignored");
            return Ok(());
        }
        self.commit(vec![Event::FileRemoved {
            path: path.to_owned(),
        }])
    }

    // -- package records --

    /// Upsert the package record for `(name, project_path)` in one
    /// ecosystem partition. The adapter log is tail-bounded before
    /// storage.
    #[allow(clippy::too_many_arguments)]
    pub fn upsert_package_record(
        &mut self,
        ecosystem: Ecosystem,
        name: &str,
        project_path: &Path,
        spec: Option<&str>,
        installed: bool,
        dev: bool,
        action: PackageAction,
        log: &str,
    ) -> Result<(), StoreError> {
        let record = PackageRecord {
            name: name.to_string(),
            project_path: project_path.to_owned(),
            spec: spec.map(str::to_string),
            installed,
            dev,
            last_action: action,
            last_action_ms: epoch_ms(),
            log: bound_adapter_log(log),
        };
        self.commit(vec![Event::PackageRecorded { ecosystem, record }])
    }

    /// All package records for one ecosystem.
    pub fn packages_for(&self, ecosystem: Ecosystem) -> Vec<PackageRecord> {
        self.state
            .packages_for(ecosystem)
            .map(|m| m.values().cloned().collect())
            .unwrap_or_default()
    }

    // -- supervisor --

    /// Append a restart event to the audit trail.
    pub fn append_restart_event(
        &mut self,
        reason: RestartReason,
        exit_code: Option<i32>,
        log_excerpt: Option<String>,
    ) -> Result<(), StoreError> {
        self.commit(vec![Event::RestartRecorded {
            event: RestartEvent {
                at_ms: epoch_ms(),
                reason,
                exit_code,
                log_excerpt,
            },
        }])
    }

    /// The restart history, oldest first.
    pub fn restart_events(&self) -> &[RestartEvent] {
        &self.state.restart_events
    }

    /// Current supervisor state.
    pub fn read_watchdog_state(&self) -> WatchdogState {
        self.state.watchdog.clone()
    }

    /// Replace the singleton supervisor state.
    pub fn write_watchdog_state(&mut self, state: WatchdogState) -> Result<(), StoreError> {
        self.commit(vec![Event::WatchdogStateWritten { state }])
    }

    // -- maintenance --

    /// Save a snapshot of the current state and truncate the WAL.
    ///
    /// Truncation only happens after the snapshot is durable (tmp write,
    /// fsync, atomic rename), so a crash mid-checkpoint loses nothing.
    pub fn checkpoint(&mut self) -> Result<(), StoreError> {
        self.wal.flush()?;
        let seq = self.wal.processed_seq();
        if seq == 0 {
            return Ok(());
        }
        let snapshot = Snapshot::new(seq, self.state.clone());
        snapshot.save(&self.snapshot_path)?;
        self.wal.truncate_before(seq + 1)?;
        debug!(seq, "checkpoint complete");
        Ok(())
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
