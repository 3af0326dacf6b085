// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! cargo adapter; installed set read from Cargo.lock

use super::{InstallOutcome, InstallRequest, PackageManager, ProjectLocks};
use crate::subprocess::{combined_output, run_with_timeout, INSTALL_TIMEOUT};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tend_core::Ecosystem;
use tokio::process::Command;
use tracing::{info, warn};

/// cargo-driven installer for Rust projects.
pub struct RustPackageManager {
    locks: ProjectLocks,
}

impl RustPackageManager {
    pub fn new(locks: ProjectLocks) -> Self {
        Self { locks }
    }
}

/// The subset of Cargo.lock we read.
#[derive(Deserialize)]
struct LockFile {
    #[serde(default)]
    package: Vec<LockPackage>,
}

#[derive(Deserialize)]
struct LockPackage {
    name: String,
    version: String,
}

/// Resolved versions from `Cargo.lock`: the ecosystem's ground truth for
/// what a build will actually use. Duplicate entries (multiple major
/// versions in the graph) keep the highest version.
fn parse_cargo_lock(text: &str) -> Result<HashMap<String, String>, toml::de::Error> {
    let lock: LockFile = toml::from_str(text)?;
    let mut result: HashMap<String, String> = HashMap::new();
    for package in lock.package {
        match result.get(&package.name) {
            Some(existing)
                if tend_core::Version::parse(existing)
                    >= tend_core::Version::parse(&package.version) => {}
            _ => {
                result.insert(package.name, package.version);
            }
        }
    }
    Ok(result)
}

#[async_trait]
impl PackageManager for RustPackageManager {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Rust
    }

    async fn install(&self, request: &InstallRequest) -> InstallOutcome {
        let lock = self.locks.for_project(&request.project_path);
        let _guard = lock.lock().await;

        let dep_spec = match &request.spec {
            Some(spec) => format!("{}@{}", request.name, spec),
            None => request.name.clone(),
        };
        info!(
            crate_spec = %dep_spec,
            dev = request.dev,
            project = %request.project_path.display(),
            "cargo add",
        );

        let mut cmd = Command::new("cargo");
        cmd.args(["add", &dep_spec]);
        if request.dev {
            cmd.arg("--dev");
        }
        cmd.current_dir(&request.project_path);

        match run_with_timeout(cmd, INSTALL_TIMEOUT, "cargo add").await {
            Ok(output) => InstallOutcome {
                ok: output.status.success(),
                output: combined_output(&output),
            },
            Err(message) => InstallOutcome::failure(message),
        }
    }

    async fn list_installed(&self, project_path: &Path) -> HashMap<String, String> {
        let lock = self.locks.for_project(project_path);
        let _guard = lock.lock().await;

        let lock_path = project_path.join("Cargo.lock");
        let text = match tokio::fs::read_to_string(&lock_path).await {
            Ok(text) => text,
            // No lockfile yet: nothing is resolved, install everything
            Err(_) => return HashMap::new(),
        };
        match parse_cargo_lock(&text) {
            Ok(installed) => installed,
            Err(e) => {
                warn!(
                    path = %lock_path.display(),
                    error = %e,
                    "unparseable Cargo.lock, treating installed set as empty",
                );
                HashMap::new()
            }
        }
    }
}

#[cfg(test)]
#[path = "rust_tests.rs"]
mod tests;
