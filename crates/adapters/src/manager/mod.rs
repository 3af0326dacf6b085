// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package-manager adapters.
//!
//! Uniform contract over `pip`, `npm`/`yarn`/`pnpm`, and `cargo`: install
//! one package, list the installed set, optionally report outdated
//! packages. Exit code zero means success; a non-zero exit is an outcome,
//! not an error; the captured output travels back as diagnostic text.
//! Invocations are serialized per project path to avoid concurrent lock
//! contention inside the vendor tools.

pub mod javascript;
pub mod python;
pub mod rust;

#[cfg(any(test, feature = "test-support"))]
pub mod fake;

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tend_core::Ecosystem;

/// A request to install (or upgrade) one package.
#[derive(Debug, Clone, PartialEq)]
pub struct InstallRequest {
    pub name: String,
    /// Declared version or range from the manifest, verbatim.
    pub spec: Option<String>,
    pub project_path: PathBuf,
    pub dev: bool,
}

/// Result of one adapter invocation.
///
/// Spawn failures also land here, with the error text as `output`, so a
/// broken tool records a failed outcome instead of aborting the
/// reconciliation.
#[derive(Debug, Clone)]
pub struct InstallOutcome {
    pub ok: bool,
    /// Captured stdout+stderr, verbatim.
    pub output: String,
}

impl InstallOutcome {
    pub fn failure(output: impl Into<String>) -> Self {
        Self {
            ok: false,
            output: output.into(),
        }
    }
}

/// An installed package with a newer release available.
#[derive(Debug, Clone, PartialEq)]
pub struct OutdatedPackage {
    pub name: String,
    pub current: String,
    pub latest: String,
}

/// Uniform adapter contract over vendor package managers.
#[async_trait]
pub trait PackageManager: Send + Sync {
    fn ecosystem(&self) -> Ecosystem;

    /// Install one package into the project.
    async fn install(&self, request: &InstallRequest) -> InstallOutcome;

    /// The ecosystem's view of what is installed: `name → version`.
    async fn list_installed(&self, project_path: &Path) -> HashMap<String, String>;

    /// One full project install (`npm install` and friends), for
    /// ecosystems that support it. `None` when unsupported.
    async fn install_all(&self, _project_path: &Path) -> Option<InstallOutcome> {
        None
    }

    /// Installed packages with newer releases, when the tool can report
    /// them.
    async fn outdated(&self, _project_path: &Path) -> Vec<OutdatedPackage> {
        Vec::new()
    }
}

/// Per-project-path invocation locks shared by all adapters.
///
/// Package managers hold their own project-level locks on disk; running
/// two invocations concurrently in one project just makes one of them
/// fail. The map grows with distinct project paths and is never pruned;
/// a workspace has a bounded set of projects.
#[derive(Clone, Default)]
pub struct ProjectLocks {
    inner: Arc<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>>,
}

impl ProjectLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// The lock guarding subprocess invocations for `project_path`.
    pub fn for_project(&self, project_path: &Path) -> Arc<tokio::sync::Mutex<()>> {
        let mut map = self.inner.lock();
        Arc::clone(
            map.entry(project_path.to_owned())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
