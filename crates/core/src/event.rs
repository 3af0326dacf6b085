// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events persisted to the write-ahead log.
//!
//! Serializes with `{"type": "scope:name", ...fields}` format. Every store
//! mutation is expressed as one of these events; materialized state is
//! derived by replay.

use crate::ecosystem::Ecosystem;
use crate::package::PackageRecord;
use crate::task::{TaskId, TaskStatus};
use crate::watchdog::{RestartEvent, WatchdogState};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Events that mutate durable state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    // -- tasks --
    #[serde(rename = "task:enqueued")]
    TaskEnqueued {
        id: TaskId,
        path: PathBuf,
        ecosystem: Ecosystem,
        created_at_ms: u64,
    },

    #[serde(rename = "task:status")]
    TaskStatusChanged {
        id: TaskId,
        status: TaskStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        at_ms: u64,
    },

    // -- tracked files --
    #[serde(rename = "file:tracked")]
    FileTracked {
        path: PathBuf,
        mtime_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        processed_at_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ecosystem: Option<Ecosystem>,
    },

    #[serde(rename = "file:removed")]
    FileRemoved { path: PathBuf },

    // -- package records --
    #[serde(rename = "package:recorded")]
    PackageRecorded {
        ecosystem: Ecosystem,
        record: PackageRecord,
    },

    // -- supervisor --
    #[serde(rename = "watchdog:restart")]
    RestartRecorded { event: RestartEvent },

    #[serde(rename = "watchdog:state")]
    WatchdogStateWritten { state: WatchdogState },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
