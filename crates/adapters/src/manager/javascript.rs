// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! npm/yarn/pnpm adapter with lockfile-based manager detection

use super::{InstallOutcome, InstallRequest, PackageManager, ProjectLocks};
use crate::subprocess::{combined_output, run_with_timeout, INSTALL_TIMEOUT, QUERY_TIMEOUT};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::Path;
use tend_core::Ecosystem;
use tokio::process::Command;
use tracing::{info, warn};

/// Which vendor tool manages a given JavaScript project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsPackageManagerKind {
    Npm,
    Yarn,
    Pnpm,
}

impl JsPackageManagerKind {
    /// Detect by lockfile: `yarn.lock` → yarn, `pnpm-lock.yaml` → pnpm,
    /// otherwise npm.
    pub fn detect(project_path: &Path) -> Self {
        if project_path.join("yarn.lock").is_file() {
            return JsPackageManagerKind::Yarn;
        }
        if project_path.join("pnpm-lock.yaml").is_file() {
            return JsPackageManagerKind::Pnpm;
        }
        JsPackageManagerKind::Npm
    }

    pub fn command(&self) -> &'static str {
        match self {
            JsPackageManagerKind::Npm => "npm",
            JsPackageManagerKind::Yarn => "yarn",
            JsPackageManagerKind::Pnpm => "pnpm",
        }
    }

    /// Arguments for installing one package.
    fn add_args(&self, package_spec: &str, dev: bool) -> Vec<String> {
        let mut args: Vec<String> = match self {
            JsPackageManagerKind::Yarn => vec!["add".into(), package_spec.into()],
            JsPackageManagerKind::Pnpm => vec!["add".into(), package_spec.into()],
            JsPackageManagerKind::Npm => vec!["install".into(), package_spec.into()],
        };
        match (self, dev) {
            (JsPackageManagerKind::Yarn, true) => args.push("--dev".into()),
            (JsPackageManagerKind::Yarn, false) => {}
            (_, true) => args.push("--save-dev".into()),
            (JsPackageManagerKind::Npm, false) => args.push("--save".into()),
            (JsPackageManagerKind::Pnpm, false) => {}
        }
        args
    }
}

impl std::fmt::Display for JsPackageManagerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command())
    }
}

/// npm/yarn/pnpm-driven installer for JavaScript projects.
pub struct JavaScriptPackageManager {
    locks: ProjectLocks,
}

impl JavaScriptPackageManager {
    pub fn new(locks: ProjectLocks) -> Self {
        Self { locks }
    }
}

/// Parse `npm list --depth=0 --json` output: `dependencies.<name>.version`.
fn parse_npm_list(stdout: &[u8]) -> Option<HashMap<String, String>> {
    let value: serde_json::Value = serde_json::from_slice(stdout).ok()?;
    let deps = value.get("dependencies")?.as_object()?;
    Some(
        deps.iter()
            .filter_map(|(name, info)| {
                info.get("version")
                    .and_then(|v| v.as_str())
                    .map(|v| (name.clone(), v.to_string()))
            })
            .collect(),
    )
}

/// Parse `yarn list --depth=0 --json` output: tree entries named
/// `package@version`.
fn parse_yarn_list(stdout: &[u8]) -> Option<HashMap<String, String>> {
    // Yarn emits one JSON object per line; the tree lives in the
    // `{"type":"tree", ...}` line.
    for line in stdout.split(|&b| b == b'\n') {
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(line) else {
            continue;
        };
        if value.get("type").and_then(|t| t.as_str()) != Some("tree") {
            continue;
        }
        let trees = value.get("data")?.get("trees")?.as_array()?;
        let mut result = HashMap::new();
        for tree in trees {
            let Some(spec) = tree.get("name").and_then(|n| n.as_str()) else {
                continue;
            };
            // Scoped packages keep their leading @: split on the last @
            if let Some(at) = spec.rfind('@').filter(|&at| at > 0) {
                result.insert(spec[..at].to_string(), spec[at + 1..].to_string());
            }
        }
        return Some(result);
    }
    None
}

/// Parse `pnpm list --depth=0 --json` output: an array of projects with
/// `dependencies`/`devDependencies` objects.
fn parse_pnpm_list(stdout: &[u8]) -> Option<HashMap<String, String>> {
    let projects: Vec<serde_json::Value> = serde_json::from_slice(stdout).ok()?;
    let mut result = HashMap::new();
    for project in &projects {
        for section in ["dependencies", "devDependencies"] {
            let Some(deps) = project.get(section).and_then(|d| d.as_object()) else {
                continue;
            };
            for (name, info) in deps {
                if let Some(version) = info.get("version").and_then(|v| v.as_str()) {
                    result.insert(name.clone(), version.to_string());
                }
            }
        }
    }
    Some(result)
}

#[async_trait]
impl PackageManager for JavaScriptPackageManager {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::JavaScript
    }

    async fn install(&self, request: &InstallRequest) -> InstallOutcome {
        let lock = self.locks.for_project(&request.project_path);
        let _guard = lock.lock().await;

        let kind = JsPackageManagerKind::detect(&request.project_path);
        let package_spec = match &request.spec {
            Some(spec) => format!("{}@{}", request.name, spec),
            None => request.name.clone(),
        };
        info!(
            package = %package_spec,
            manager = %kind,
            dev = request.dev,
            project = %request.project_path.display(),
            "js install",
        );

        let mut cmd = Command::new(kind.command());
        cmd.args(kind.add_args(&package_spec, request.dev))
            .current_dir(&request.project_path);

        match run_with_timeout(cmd, INSTALL_TIMEOUT, "package install").await {
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

        let kind = JsPackageManagerKind::detect(project_path);
        let mut cmd = Command::new(kind.command());
        cmd.args(["list", "--depth=0", "--json"])
            .current_dir(project_path);

        let output = match run_with_timeout(cmd, QUERY_TIMEOUT, "package list").await {
            Ok(output) => output,
            Err(message) => {
                warn!(error = %message, "package list failed, treating installed set as empty");
                return HashMap::new();
            }
        };
        // npm exits non-zero on peer-dependency problems while still
        // printing a usable tree, so parse regardless of status.
        if !output.status.success() {
            warn!(
                code = output.status.code(),
                manager = %kind,
                "package list exited non-zero, parsing output anyway",
            );
        }

        let parsed = match kind {
            JsPackageManagerKind::Npm => parse_npm_list(&output.stdout),
            JsPackageManagerKind::Yarn => parse_yarn_list(&output.stdout),
            JsPackageManagerKind::Pnpm => parse_pnpm_list(&output.stdout),
        };
        parsed.unwrap_or_else(|| {
            warn!(manager = %kind, "unparseable package list output");
            HashMap::new()
        })
    }

    /// One full `npm|yarn|pnpm install`, used when `node_modules` is
    /// absent.
    async fn install_all(&self, project_path: &Path) -> Option<InstallOutcome> {
        let lock = self.locks.for_project(project_path);
        let _guard = lock.lock().await;

        let kind = JsPackageManagerKind::detect(project_path);
        info!(manager = %kind, project = %project_path.display(), "full install");

        let mut cmd = Command::new(kind.command());
        cmd.arg("install").current_dir(project_path);

        Some(
            match run_with_timeout(cmd, INSTALL_TIMEOUT, "full install").await {
                Ok(output) => InstallOutcome {
                    ok: output.status.success(),
                    output: combined_output(&output),
                },
                Err(message) => InstallOutcome::failure(message),
            },
        )
    }
}

#[cfg(test)]
#[path = "javascript_tests.rs"]
mod tests;
