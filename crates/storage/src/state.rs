// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Materialized state from WAL replay.
//!
//! Events are facts about what happened; state is derived from those
//! facts. Each committed event is applied exactly once: synchronously in
//! `Store::commit` and again only during startup replay, which rebuilds
//! the map from scratch. Handlers use plain assignment and rely on
//! the status guards for ordering, not on replay-level dedup.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use tend_core::{
    package_key, Ecosystem, Event, PackageRecord, RestartEvent, Task, TaskStatus, TrackedFile,
    WatchdogState,
};
use tracing::warn;

/// Materialized state built from WAL events.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct MaterializedState {
    /// All tasks ever enqueued, keyed by id. Retained for audit.
    #[serde(default)]
    pub tasks: HashMap<String, Task>,
    /// Manifest files the watcher has seen, keyed by absolute path.
    #[serde(default)]
    pub tracked_files: HashMap<PathBuf, TrackedFile>,
    /// Package records partitioned per ecosystem, keyed by
    /// `(name, project_path)`.
    #[serde(default)]
    pub packages: BTreeMap<Ecosystem, HashMap<String, PackageRecord>>,
    /// Append-only restart history (supervisor store only).
    #[serde(default)]
    pub restart_events: Vec<RestartEvent>,
    /// Singleton supervisor state (supervisor store only).
    #[serde(default)]
    pub watchdog: WatchdogState,
}

impl MaterializedState {
    /// Look up a task by id.
    pub fn get_task(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    /// Pending tasks ordered by creation time (ties broken by id for
    /// deterministic ordering), up to `limit`.
    pub fn pending_tasks(&self, limit: usize) -> Vec<Task> {
        let mut pending: Vec<&Task> = self
            .tasks
            .values()
            .filter(|t| t.status == TaskStatus::Pending)
            .collect();
        pending.sort_by(|a, b| {
            a.created_at_ms
                .cmp(&b.created_at_ms)
                .then_with(|| a.id.as_str().cmp(b.id.as_str()))
        });
        pending.into_iter().take(limit).cloned().collect()
    }

    /// Tasks currently marked `processing` (interrupted work after a
    /// crash).
    pub fn processing_tasks(&self) -> Vec<Task> {
        self.tasks
            .values()
            .filter(|t| t.status == TaskStatus::Processing)
            .cloned()
            .collect()
    }

    /// Package records for one ecosystem partition.
    pub fn packages_for(&self, ecosystem: Ecosystem) -> Option<&HashMap<String, PackageRecord>> {
        self.packages.get(&ecosystem)
    }

    /// Apply an event to derive state changes.
    pub fn apply_event(&mut self, event: &Event) {
        match event {
            Event::TaskEnqueued {
                id,
                path,
                ecosystem,
                created_at_ms,
            } => {
                // Guard against duplicate enqueue of the same id
                if !self.tasks.contains_key(id.as_str()) {
                    self.tasks.insert(
                        id.as_str().to_string(),
                        Task::file_processing(id.clone(), path.clone(), *ecosystem, *created_at_ms),
                    );
                }
            }

            Event::TaskStatusChanged {
                id,
                status,
                error,
                at_ms,
            } => {
                let Some(task) = self.tasks.get_mut(id.as_str()) else {
                    warn!(task_id = %id, "status change for unknown task");
                    return;
                };
                // Status transitions are monotonic forward; terminal states
                // never regress.
                if !task.status.can_advance_to(*status) {
                    warn!(
                        task_id = %id,
                        from = %task.status,
                        to = %status,
                        "ignoring illegal task transition",
                    );
                    return;
                }
                task.status = *status;
                task.updated_at_ms = *at_ms;
                if error.is_some() {
                    task.error.clone_from(error);
                }
            }

            Event::FileTracked {
                path,
                mtime_ms,
                processed_at_ms,
                ecosystem,
            } => {
                let entry = self
                    .tracked_files
                    .entry(path.clone())
                    .or_insert_with(|| TrackedFile {
                        path: path.clone(),
                        mtime_ms: *mtime_ms,
                        processed_at_ms: None,
                        ecosystem: *ecosystem,
                    });
                entry.mtime_ms = *mtime_ms;
                entry.ecosystem = *ecosystem;
                if processed_at_ms.is_some() {
                    entry.processed_at_ms = *processed_at_ms;
                }
            }

            Event::FileRemoved { path } => {
                self.tracked_files.remove(path);
            }

            Event::PackageRecorded { ecosystem, record } => {
                // Upsert: at most one record per (name, project_path)
                let key = package_key(&record.name, &record.project_path);
                self.packages
                    .entry(*ecosystem)
                    .or_default()
                    .insert(key, record.clone());
            }

            Event::RestartRecorded { event } => {
                self.restart_events.push(event.clone());
            }

            Event::WatchdogStateWritten { state } => {
                // restart_count is monotonically non-decreasing across
                // supervisor lifetimes
                if state.restart_count < self.watchdog.restart_count {
                    warn!(
                        stored = self.watchdog.restart_count,
                        written = state.restart_count,
                        "ignoring watchdog state that would decrease restart_count",
                    );
                    return;
                }
                self.watchdog = state.clone();
            }
        }
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
