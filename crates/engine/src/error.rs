// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the engine

use tend_storage::StoreError;
use thiserror::Error;

/// Errors configuring or running the file watcher
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        source: glob::PatternError,
    },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors during one reconciliation pass
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// The manifest could not be read or parsed; the adapter is never
    /// invoked for these.
    #[error("manifest parse: {0}")]
    ManifestParse(String),
    #[error("no adapter registered for ecosystem {0}")]
    NoAdapter(tend_core::Ecosystem),
    #[error(transparent)]
    Store(#[from] StoreError),
}
