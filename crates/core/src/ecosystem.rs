// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ecosystem tags for manifest routing.
//!
//! Routing from a manifest path to its handler is a closed enum so that
//! dispatch is exhaustive and compiler-checked.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The package ecosystems tend reconciles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ecosystem {
    Python,
    JavaScript,
    Rust,
}

impl Ecosystem {
    /// Infer the ecosystem from a manifest path by its file name.
    ///
    /// Returns `None` for files the watcher matched but no handler owns
    /// (e.g. `*.csproj` from the default config).
    pub fn from_manifest_path(path: &Path) -> Option<Self> {
        match path.file_name().and_then(|n| n.to_str()) {
            Some("requirements.txt") => Some(Ecosystem::Python),
            Some("package.json") => Some(Ecosystem::JavaScript),
            Some("Cargo.toml") => Some(Ecosystem::Rust),
            _ => None,
        }
    }

    /// The manifest file name this ecosystem is keyed on.
    pub fn manifest_name(&self) -> &'static str {
        match self {
            Ecosystem::Python => "requirements.txt",
            Ecosystem::JavaScript => "package.json",
            Ecosystem::Rust => "Cargo.toml",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Ecosystem::Python => write!(f, "python"),
            Ecosystem::JavaScript => write!(f, "javascript"),
            Ecosystem::Rust => write!(f, "rust"),
        }
    }
}

#[cfg(test)]
#[path = "ecosystem_tests.rs"]
mod tests;
