// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pip adapter with virtual-environment detection

use super::{InstallOutcome, InstallRequest, OutdatedPackage, PackageManager, ProjectLocks};
use crate::subprocess::{combined_output, run_with_timeout, INSTALL_TIMEOUT, PROBE_TIMEOUT, QUERY_TIMEOUT};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tend_core::Ecosystem;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Virtual-environment directory names probed under the project root.
const VENV_DIRS: &[&str] = &[".venv", "venv", "env", ".env"];

/// pip-driven installer for Python projects.
pub struct PythonPackageManager {
    locks: ProjectLocks,
    /// Interpreter used when no virtual environment is found.
    system_python: String,
}

impl PythonPackageManager {
    pub fn new(locks: ProjectLocks) -> Self {
        let system_python =
            std::env::var("TEND_PYTHON").unwrap_or_else(|_| "python3".to_string());
        Self {
            locks,
            system_python,
        }
    }

    /// Pick the interpreter for a project: a detected venv, a
    /// Poetry-reported environment, or the system interpreter.
    async fn interpreter(&self, project_path: &Path) -> String {
        for dir in VENV_DIRS {
            let candidate = project_path.join(dir).join("bin").join("python");
            if candidate.is_file() {
                debug!(venv = %candidate.display(), "using project virtualenv");
                return candidate.display().to_string();
            }
        }

        if project_path.join("poetry.lock").is_file() {
            if let Some(python) = poetry_env_python(project_path).await {
                debug!(venv = %python.display(), "using poetry environment");
                return python.display().to_string();
            }
        }

        self.system_python.clone()
    }

    /// `name` plus its spec in pip's requirement syntax.
    fn requirement_arg(request: &InstallRequest) -> String {
        match &request.spec {
            None => request.name.clone(),
            Some(spec) if spec.starts_with(['=', '<', '>', '~', '!']) => {
                format!("{}{}", request.name, spec)
            }
            // A bare version pins exactly
            Some(spec) => format!("{}=={}", request.name, spec),
        }
    }
}

/// Ask Poetry where its virtualenv lives. Best-effort: any failure means
/// "no poetry environment".
async fn poetry_env_python(project_path: &Path) -> Option<PathBuf> {
    let mut cmd = Command::new("poetry");
    cmd.args(["env", "info", "-p"]).current_dir(project_path);
    let output = run_with_timeout(cmd, PROBE_TIMEOUT, "poetry env info")
        .await
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let env_dir = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if env_dir.is_empty() {
        return None;
    }
    let python = PathBuf::from(env_dir).join("bin").join("python");
    python.is_file().then_some(python)
}

/// One row of `pip list --format=json`.
#[derive(Deserialize)]
struct PipListEntry {
    name: String,
    version: String,
}

/// One row of `pip list --outdated --format=json`.
#[derive(Deserialize)]
struct PipOutdatedEntry {
    name: String,
    version: String,
    latest_version: String,
}

#[async_trait]
impl PackageManager for PythonPackageManager {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::Python
    }

    async fn install(&self, request: &InstallRequest) -> InstallOutcome {
        let lock = self.locks.for_project(&request.project_path);
        let _guard = lock.lock().await;

        let python = self.interpreter(&request.project_path).await;
        let requirement = Self::requirement_arg(request);
        info!(package = %requirement, project = %request.project_path.display(), "pip install");

        let mut cmd = Command::new(&python);
        cmd.args(["-m", "pip", "install", &requirement, "--no-input"])
            .current_dir(&request.project_path);

        match run_with_timeout(cmd, INSTALL_TIMEOUT, "pip install").await {
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

        let python = self.interpreter(project_path).await;
        let mut cmd = Command::new(&python);
        cmd.args(["-m", "pip", "list", "--format=json"])
            .current_dir(project_path);

        let output = match run_with_timeout(cmd, QUERY_TIMEOUT, "pip list").await {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                warn!(
                    code = output.status.code(),
                    "pip list exited non-zero, treating installed set as empty",
                );
                return HashMap::new();
            }
            Err(message) => {
                warn!(error = %message, "pip list failed, treating installed set as empty");
                return HashMap::new();
            }
        };

        match serde_json::from_slice::<Vec<PipListEntry>>(&output.stdout) {
            Ok(entries) => entries
                .into_iter()
                .map(|e| (e.name, e.version))
                .collect(),
            Err(e) => {
                warn!(error = %e, "unparseable pip list output");
                HashMap::new()
            }
        }
    }

    async fn outdated(&self, project_path: &Path) -> Vec<OutdatedPackage> {
        let lock = self.locks.for_project(project_path);
        let _guard = lock.lock().await;

        let python = self.interpreter(project_path).await;
        let mut cmd = Command::new(&python);
        cmd.args(["-m", "pip", "list", "--outdated", "--format=json"])
            .current_dir(project_path);

        let Ok(output) = run_with_timeout(cmd, QUERY_TIMEOUT, "pip list --outdated").await else {
            return Vec::new();
        };
        if !output.status.success() {
            return Vec::new();
        }

        serde_json::from_slice::<Vec<PipOutdatedEntry>>(&output.stdout)
            .map(|entries| {
                entries
                    .into_iter()
                    .map(|e| OutdatedPackage {
                        name: e.name,
                        current: e.version,
                        latest: e.latest_version,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
#[path = "python_tests.rs"]
mod tests;
