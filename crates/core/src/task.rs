// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task records for the durable work queue

use crate::define_id;
use crate::ecosystem::Ecosystem;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

define_id! {
    /// Unique identifier for a task.
    pub struct TaskId;
}

/// Kind of work a task represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Reconcile a single manifest file against its installed set.
    FileProcessing,
}

/// Status of a task through its lifecycle.
///
/// Transitions are monotonic forward: `pending → processing → completed |
/// failed`. The single exception is startup recovery, which may move an
/// interrupted `processing` task back to `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl TaskStatus {
    /// Whether the task has reached a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed)
    }

    /// Whether a transition to `next` is legal.
    pub fn can_advance_to(&self, next: TaskStatus) -> bool {
        match (self, next) {
            (TaskStatus::Pending, TaskStatus::Processing) => true,
            (TaskStatus::Processing, TaskStatus::Completed) => true,
            (TaskStatus::Processing, TaskStatus::Failed) => true,
            // Startup recovery of an interrupted task
            (TaskStatus::Processing, TaskStatus::Pending) => true,
            _ => false,
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Processing => write!(f, "processing"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// A unit of work: reconcile one manifest file.
///
/// Tasks are retained after completion for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub kind: TaskKind,
    /// Absolute path of the manifest this task processes.
    pub path: PathBuf,
    /// Handler routing tag.
    pub ecosystem: Ecosystem,
    pub status: TaskStatus,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Task {
    /// Create a new pending file-processing task.
    pub fn file_processing(
        id: TaskId,
        path: PathBuf,
        ecosystem: Ecosystem,
        created_at_ms: u64,
    ) -> Self {
        Self {
            id,
            kind: TaskKind::FileProcessing,
            path,
            ecosystem,
            status: TaskStatus::Pending,
            created_at_ms,
            updated_at_ms: created_at_ms,
            error: None,
        }
    }
}

/// A tracked manifest file and its last observed state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub path: PathBuf,
    /// Last observed mtime in epoch milliseconds.
    pub mtime_ms: u64,
    /// When a change to this file was last queued for processing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at_ms: Option<u64>,
    /// Inferred ecosystem; `None` when no handler owns the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecosystem: Option<Ecosystem>,
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
