// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-ecosystem reconciliation.
//!
//! The common contract: parse the manifest, query the installed set from
//! the adapter, diff declared against installed with the typed version
//! specs, execute install/upgrade actions serially per manifest, record
//! every outcome as a package record, and submit the action list to the
//! advisor best-effort under a timeout.

pub mod javascript;
pub mod python;
pub mod rust;

use crate::error::ReconcileError;
use crate::queue::{TaskFailure, TaskHandler};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tend_adapters::{Advisor, InstallRequest, PackageManager};
use tend_core::{satisfies, ActionRecord, Ecosystem, PackageAction, Task};
use tend_storage::Store;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

/// Default timeout for one advisor submission.
pub const DEFAULT_ADVISOR_TIMEOUT: Duration = Duration::from_secs(10);

/// One declared dependency from a manifest.
#[derive(Debug, Clone, PartialEq)]
pub struct Declared {
    pub name: String,
    /// Version or range, verbatim from the manifest.
    pub spec: Option<String>,
    pub dev: bool,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default)]
pub struct ReconcileSummary {
    /// Every declared dependency with the action taken, in manifest order.
    pub actions: Vec<ActionRecord>,
}

impl ReconcileSummary {
    /// Installs/upgrades that succeeded.
    pub fn changed(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action != PackageAction::None && a.success)
            .count()
    }

    /// Actions that invoked the adapter at all.
    pub fn attempted(&self) -> usize {
        self.actions
            .iter()
            .filter(|a| a.action != PackageAction::None)
            .count()
    }
}

/// Ecosystem-routing reconciler.
pub struct Reconciler {
    store: Arc<Mutex<Store>>,
    managers: HashMap<Ecosystem, Arc<dyn PackageManager>>,
    advisor: Arc<dyn Advisor>,
    advisor_timeout: Duration,
}

impl Reconciler {
    pub fn new(store: Arc<Mutex<Store>>, advisor: Arc<dyn Advisor>) -> Self {
        Self {
            store,
            managers: HashMap::new(),
            advisor,
            advisor_timeout: DEFAULT_ADVISOR_TIMEOUT,
        }
    }

    pub fn with_manager(mut self, manager: Arc<dyn PackageManager>) -> Self {
        self.managers.insert(manager.ecosystem(), manager);
        self
    }

    pub fn with_advisor_timeout(mut self, advisor_timeout: Duration) -> Self {
        self.advisor_timeout = advisor_timeout;
        self
    }

    /// Reconcile one manifest against its project's installed set.
    pub async fn reconcile(
        &self,
        manifest_path: &Path,
        ecosystem: Ecosystem,
    ) -> Result<ReconcileSummary, ReconcileError> {
        let bytes = tokio::fs::read(manifest_path)
            .await
            .map_err(|e| ReconcileError::ManifestParse(format!("cannot read manifest: {e}")))?;
        // Strict policy: non-UTF-8 manifests are rejected
        let text = String::from_utf8(bytes)
            .map_err(|_| ReconcileError::ManifestParse("manifest is not valid UTF-8".to_string()))?;

        let declared = match ecosystem {
            Ecosystem::Python => python::parse_requirements(&text)?,
            Ecosystem::JavaScript => javascript::parse_package_json(&text)?,
            Ecosystem::Rust => rust::parse_cargo_manifest(&text)?,
        };

        // Empty manifest: empty action list, no adapter calls
        if declared.is_empty() {
            debug!(manifest = %manifest_path.display(), "manifest declares nothing");
            return Ok(ReconcileSummary::default());
        }

        let manager = self
            .managers
            .get(&ecosystem)
            .ok_or(ReconcileError::NoAdapter(ecosystem))?;
        let project = manifest_path
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .to_owned();

        // JavaScript with no node_modules: one full install instead of
        // per-package installs; all declared dependencies are assumed
        // installed on success.
        let summary = if ecosystem == Ecosystem::JavaScript && !project.join("node_modules").is_dir()
        {
            if let Some(outcome) = manager.install_all(&project).await {
                let mut actions = Vec::with_capacity(declared.len());
                let mut store = self.store.lock();
                for dep in &declared {
                    store.upsert_package_record(
                        ecosystem,
                        &dep.name,
                        &project,
                        dep.spec.as_deref(),
                        outcome.ok,
                        dep.dev,
                        PackageAction::Install,
                        &outcome.output,
                    )?;
                    actions.push(ActionRecord {
                        name: dep.name.clone(),
                        action: PackageAction::Install,
                        success: outcome.ok,
                        spec: dep.spec.clone(),
                        installed_version: None,
                        dev: dep.dev,
                    });
                }
                ReconcileSummary { actions }
            } else {
                self.reconcile_per_package(manager, ecosystem, &project, &declared)
                    .await?
            }
        } else {
            self.reconcile_per_package(manager, ecosystem, &project, &declared)
                .await?
        };

        info!(
            manifest = %manifest_path.display(),
            declared = summary.actions.len(),
            changed = summary.changed(),
            "reconciliation pass complete",
        );

        self.submit_to_advisor(&summary, &text, ecosystem).await;

        Ok(summary)
    }

    /// The standard path: diff each declared dependency against the
    /// installed set and close the gap one package at a time.
    async fn reconcile_per_package(
        &self,
        manager: &Arc<dyn PackageManager>,
        ecosystem: Ecosystem,
        project: &Path,
        declared: &[Declared],
    ) -> Result<ReconcileSummary, ReconcileError> {
        let installed = manager.list_installed(project).await;
        let mut actions = Vec::with_capacity(declared.len());

        for dep in declared {
            let installed_version = installed.get(&dep.name).cloned();
            let action = match (&installed_version, &dep.spec) {
                (None, _) => PackageAction::Install,
                (Some(version), Some(spec)) if !satisfies(version, spec, ecosystem) => {
                    PackageAction::Upgrade
                }
                _ => PackageAction::None,
            };

            if action == PackageAction::None {
                debug!(package = %dep.name, version = ?installed_version, "already satisfied");
                actions.push(ActionRecord {
                    name: dep.name.clone(),
                    action,
                    success: true,
                    spec: dep.spec.clone(),
                    installed_version,
                    dev: dep.dev,
                });
                continue;
            }

            // Adapters are not reentrant per project path; execute serially
            let outcome = manager
                .install(&InstallRequest {
                    name: dep.name.clone(),
                    spec: dep.spec.clone(),
                    project_path: project.to_owned(),
                    dev: dep.dev,
                })
                .await;
            if !outcome.ok {
                error!(
                    package = %dep.name,
                    action = %action,
                    "adapter invocation failed",
                );
            }
            self.store.lock().upsert_package_record(
                ecosystem,
                &dep.name,
                project,
                dep.spec.as_deref(),
                outcome.ok,
                dep.dev,
                action,
                &outcome.output,
            )?;
            actions.push(ActionRecord {
                name: dep.name.clone(),
                action,
                success: outcome.ok,
                spec: dep.spec.clone(),
                installed_version,
                dev: dep.dev,
            });
        }

        Ok(ReconcileSummary { actions })
    }

    /// Best-effort advisor submission. Absence, failure, or timeout is
    /// never a task failure.
    async fn submit_to_advisor(
        &self,
        summary: &ReconcileSummary,
        manifest_text: &str,
        ecosystem: Ecosystem,
    ) {
        let report = match timeout(
            self.advisor_timeout,
            self.advisor
                .analyze(&summary.actions, manifest_text, ecosystem),
        )
        .await
        {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                debug!(error = %e, "advisor analysis skipped");
                return;
            }
            Err(_elapsed) => {
                debug!(
                    timeout_secs = self.advisor_timeout.as_secs(),
                    "advisor analysis timed out",
                );
                return;
            }
        };

        if report.is_empty() {
            return;
        }
        if !report.missing_dependencies.is_empty() {
            let names: Vec<&str> = report
                .missing_dependencies
                .iter()
                .map(|s| s.name.as_str())
                .collect();
            info!(suggested = names.join(", "), "advisor suggests additional dependencies");
        }
        if !report.updates.is_empty() {
            let names: Vec<&str> = report.updates.iter().map(|s| s.name.as_str()).collect();
            info!(suggested = names.join(", "), "advisor suggests updates");
        }
        if !report.security_issues.is_empty() {
            let names: Vec<&str> = report
                .security_issues
                .iter()
                .map(|s| s.name.as_str())
                .collect();
            warn!(flagged = names.join(", "), "advisor flagged security concerns");
        }
        if !report.compatibility_issues.is_empty() {
            let names: Vec<&str> = report
                .compatibility_issues
                .iter()
                .map(|s| s.name.as_str())
                .collect();
            warn!(flagged = names.join(", "), "advisor flagged compatibility concerns");
        }
    }
}

/// Routes file-processing tasks to the reconciler.
pub struct ReconcileHandler {
    reconciler: Reconciler,
}

impl ReconcileHandler {
    pub fn new(reconciler: Reconciler) -> Self {
        Self { reconciler }
    }
}

#[async_trait]
impl TaskHandler for ReconcileHandler {
    async fn handle(&self, task: &Task) -> Result<(), TaskFailure> {
        match self.reconciler.reconcile(&task.path, task.ecosystem).await {
            Ok(_summary) => Ok(()),
            Err(e) => Err(TaskFailure::new(e.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod tests;
