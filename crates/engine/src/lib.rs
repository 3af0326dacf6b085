// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! tend-engine: the daemon's moving parts.
//!
//! File watching, the durable task queue and its scheduler, per-ecosystem
//! reconciliation, and the heartbeat. Everything here runs on one
//! cooperative runtime and stops via a shared cancellation token.

pub mod error;
pub mod heartbeat;
pub mod queue;
pub mod reconcile;
pub mod watcher;

pub use error::{ReconcileError, WatchError};
pub use heartbeat::{
    has_shutdown_marker, heartbeat_age, Heartbeat, DEFAULT_HEARTBEAT_INTERVAL, SHUTDOWN_MARKER,
};
pub use queue::{Scheduler, TaskFailure, TaskHandler, TaskQueue, DEFAULT_CONCURRENCY};
pub use reconcile::{
    Declared, ReconcileHandler, ReconcileSummary, Reconciler, DEFAULT_ADVISOR_TIMEOUT,
};
pub use watcher::{
    FileEvent, FileWatcher, WatcherConfig, DEFAULT_DEBOUNCE, DEFAULT_SCAN_INTERVAL,
};
