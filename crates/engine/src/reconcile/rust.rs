// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Cargo.toml dependency sections

use super::Declared;
use crate::error::ReconcileError;
use toml::Value;

/// Parse a Cargo.toml manifest into declared dependencies, regular first,
/// then dev.
///
/// A dependency value is either a version string or a table with an
/// optional `version` key (git/path/workspace dependencies carry no
/// version spec).
pub fn parse_cargo_manifest(text: &str) -> Result<Vec<Declared>, ReconcileError> {
    let manifest: toml::Table = toml::from_str(text)
        .map_err(|e| ReconcileError::ManifestParse(format!("Cargo.toml: {e}")))?;

    let mut declared = Vec::new();
    for (section, dev) in [("dependencies", false), ("dev-dependencies", true)] {
        let Some(value) = manifest.get(section) else {
            continue;
        };
        let table = value.as_table().ok_or_else(|| {
            ReconcileError::ManifestParse(format!("Cargo.toml: [{section}] is not a table"))
        })?;
        for (name, entry) in table {
            let spec = match entry {
                Value::String(version) => Some(version.clone()),
                Value::Table(fields) => match fields.get("version") {
                    Some(Value::String(version)) => Some(version.clone()),
                    Some(other) => {
                        return Err(ReconcileError::ManifestParse(format!(
                            "Cargo.toml: {name}.version is not a string ({other})"
                        )));
                    }
                    None => None,
                },
                other => {
                    return Err(ReconcileError::ManifestParse(format!(
                        "Cargo.toml: dependency {name} has unsupported value {other}"
                    )));
                }
            };
            declared.push(Declared {
                name: name.clone(),
                spec,
                dev,
            });
        }
    }
    Ok(declared)
}

#[cfg(test)]
#[path = "rust_tests.rs"]
mod tests;
