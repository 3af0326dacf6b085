// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Package records and reconciliation actions

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Maximum bytes of adapter output retained on a package record.
pub const MAX_ADAPTER_LOG: usize = 8 * 1024;

/// Action the reconciler decided on for a declared dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageAction {
    Install,
    Upgrade,
    None,
}

impl std::fmt::Display for PackageAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PackageAction::Install => write!(f, "install"),
            PackageAction::Upgrade => write!(f, "upgrade"),
            PackageAction::None => write!(f, "none"),
        }
    }
}

/// Durable record of the last adapter action for one `(name, project)` pair.
///
/// Upserted on every install/upgrade; at most one record exists per
/// `(name, project_path)` within an ecosystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageRecord {
    pub name: String,
    pub project_path: PathBuf,
    /// Declared version or range from the manifest, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    pub installed: bool,
    #[serde(default)]
    pub dev: bool,
    pub last_action: PackageAction,
    pub last_action_ms: u64,
    /// Combined stdout+stderr of the adapter invocation, tail-bounded.
    #[serde(default)]
    pub log: String,
}

impl PackageRecord {
    /// Key uniquely identifying this record within an ecosystem partition.
    pub fn key(&self) -> String {
        package_key(&self.name, &self.project_path)
    }
}

/// Map key for a `(name, project_path)` pair.
pub fn package_key(name: &str, project_path: &std::path::Path) -> String {
    format!("{}|{}", name, project_path.display())
}

/// Bound adapter output to [`MAX_ADAPTER_LOG`] bytes, keeping the tail.
///
/// Errors show up at the end of package-manager output, so the tail is the
/// useful slice.
pub fn bound_adapter_log(output: &str) -> String {
    if output.len() <= MAX_ADAPTER_LOG {
        return output.to_string();
    }
    let start = output.len() - MAX_ADAPTER_LOG;
    // Snap forward to a char boundary
    let mut idx = start;
    while idx < output.len() && !output.is_char_boundary(idx) {
        idx += 1;
    }
    output[idx..].to_string()
}

/// Outcome of one reconciliation decision, submitted to the advisor and
/// summarized in logs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRecord {
    pub name: String,
    pub action: PackageAction,
    pub success: bool,
    /// Declared spec from the manifest.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    /// Version the ecosystem reported as installed before the action.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_version: Option<String>,
    #[serde(default)]
    pub dev: bool,
}

#[cfg(test)]
#[path = "package_tests.rs"]
mod tests;
