// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable task queue and its scheduler.
//!
//! Enqueuing writes a `pending` row to the store before the task is
//! schedulable, so a crash between enqueue and processing preserves the
//! work. The scheduler claims up to the concurrency bound each cycle,
//! flips tasks to `processing` one committed event at a time, and runs
//! handlers concurrently on a `JoinSet`.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tend_core::{epoch_ms, Ecosystem, IdGen, Task, TaskId, TaskStatus, UuidIdGen};
use tend_storage::{Store, StoreError};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Bounded concurrency: at most this many tasks are in flight at once.
pub const DEFAULT_CONCURRENCY: usize = 5;

/// Scheduler poll cadence between claim cycles.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// A handler failure; the message lands in the task's `error` column.
#[derive(Debug, Clone)]
pub struct TaskFailure {
    pub message: String,
}

impl TaskFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Processes one claimed task.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, task: &Task) -> Result<(), TaskFailure>;
}

/// Durable producer side of the queue.
#[derive(Clone)]
pub struct TaskQueue {
    store: Arc<Mutex<Store>>,
    ids: UuidIdGen,
}

impl TaskQueue {
    pub fn new(store: Arc<Mutex<Store>>) -> Self {
        Self {
            store,
            ids: UuidIdGen,
        }
    }

    /// Enqueue a file-processing task. The `pending` row is durable before
    /// this returns.
    pub fn enqueue_file_task(
        &self,
        path: PathBuf,
        ecosystem: Ecosystem,
    ) -> Result<Task, StoreError> {
        let task = Task::file_processing(
            TaskId::new(self.ids.next()),
            path,
            ecosystem,
            epoch_ms(),
        );
        self.store.lock().upsert_task(&task)?;
        info!(
            task_id = task.id.short(8),
            path = %task.path.display(),
            "scheduled file processing task",
        );
        Ok(task)
    }
}

/// Cooperative scheduler loop.
///
/// Single-threaded with respect to claiming; handlers run concurrently
/// with respect to each other, bounded by `concurrency`.
pub struct Scheduler {
    store: Arc<Mutex<Store>>,
    handler: Arc<dyn TaskHandler>,
    concurrency: usize,
    poll_interval: Duration,
}

impl Scheduler {
    pub fn new(store: Arc<Mutex<Store>>, handler: Arc<dyn TaskHandler>) -> Self {
        Self {
            store,
            handler,
            concurrency: DEFAULT_CONCURRENCY,
            poll_interval: POLL_INTERVAL,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Claim pending tasks up to the free concurrency slots, flipping each
    /// to `processing` with one committed event per task.
    fn claim(&self, free_slots: usize) -> Vec<Task> {
        if free_slots == 0 {
            return Vec::new();
        }
        let mut store = self.store.lock();
        let pending = store.list_pending_tasks(free_slots);
        let mut claimed = Vec::with_capacity(pending.len());
        for task in pending {
            match store.advance_task_status(&task.id, TaskStatus::Processing, None) {
                Ok(()) => claimed.push(task),
                Err(e) => error!(task_id = %task.id, error = %e, "failed to claim task"),
            }
        }
        claimed
    }

    /// Record a handler outcome as `completed` or `failed`.
    fn settle(&self, id: &TaskId, result: Result<(), TaskFailure>) {
        let (status, error) = match result {
            Ok(()) => (TaskStatus::Completed, None),
            Err(failure) => {
                error!(task_id = %id, error = %failure, "task failed");
                (TaskStatus::Failed, Some(failure.message))
            }
        };
        if let Err(e) = self
            .store
            .lock()
            .advance_task_status(id, status, error)
        {
            error!(task_id = %id, error = %e, "failed to record task outcome");
        }
    }

    /// Run until cancellation. On cancel the scheduler stops dequeuing,
    /// drains in-flight tasks to completion, and returns.
    pub async fn run(self, cancel: CancellationToken) {
        info!(concurrency = self.concurrency, "scheduler started");

        let mut inflight: JoinSet<(TaskId, Result<(), TaskFailure>)> = JoinSet::new();
        let mut tick = tokio::time::interval(self.poll_interval);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                _ = tick.tick() => {
                    let free_slots = self.concurrency - inflight.len();
                    for task in self.claim(free_slots) {
                        let handler = Arc::clone(&self.handler);
                        inflight.spawn(async move {
                            let result = handler.handle(&task).await;
                            (task.id, result)
                        });
                    }
                }

                Some(joined) = inflight.join_next() => {
                    match joined {
                        Ok((id, result)) => self.settle(&id, result),
                        Err(e) => warn!(error = %e, "task handler panicked or was aborted"),
                    }
                }
            }
        }

        // Drain: finish current tasks, claim nothing further
        info!(inflight = inflight.len(), "scheduler draining");
        while let Some(joined) = inflight.join_next().await {
            match joined {
                Ok((id, result)) => self.settle(&id, result),
                Err(e) => warn!(error = %e, "task handler panicked or was aborted"),
            }
        }
        info!("scheduler stopped");
    }
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
