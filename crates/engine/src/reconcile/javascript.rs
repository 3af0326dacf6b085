// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! package.json dependency sections

use super::Declared;
use crate::error::ReconcileError;
use serde::Deserialize;
use std::collections::BTreeMap;

/// The subset of package.json we read. Dependency maps must be
/// string-valued; anything else fails the parse.
#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, String>,
}

/// Parse a package.json file into declared dependencies, regular first,
/// then dev.
pub fn parse_package_json(text: &str) -> Result<Vec<Declared>, ReconcileError> {
    let manifest: PackageJson = serde_json::from_str(text)
        .map_err(|e| ReconcileError::ManifestParse(format!("package.json: {e}")))?;

    let mut declared = Vec::new();
    for (name, spec) in manifest.dependencies {
        declared.push(Declared {
            name,
            spec: Some(spec).filter(|s| !s.is_empty()),
            dev: false,
        });
    }
    for (name, spec) in manifest.dev_dependencies {
        declared.push(Declared {
            name,
            spec: Some(spec).filter(|s| !s.is_empty()),
            dev: true,
        });
    }
    Ok(declared)
}

#[cfg(test)]
#[path = "javascript_tests.rs"]
mod tests;
