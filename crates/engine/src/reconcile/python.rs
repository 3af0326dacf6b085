// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! requirements.txt line grammar

use super::Declared;
use crate::error::ReconcileError;
use regex::Regex;
use std::sync::OnceLock;

/// Conservative requirement line: name, optional extras, optional version
/// spec starting with an operator character.
#[allow(clippy::expect_used)]
fn requirement_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([A-Za-z0-9_\-\.]+)(?:\[([^\]]+)\])?\s*([=~<>!].*)?$")
            .expect("requirement regex is valid")
    })
}

/// Parse a requirements.txt file.
///
/// Comments, blank lines, pip options (`-...`), and line continuations
/// are skipped; environment markers after `;` are dropped. A remaining
/// line that does not match the conservative grammar fails the whole
/// parse; malformed manifests become failed tasks, retried on the next
/// modification.
pub fn parse_requirements(text: &str) -> Result<Vec<Declared>, ReconcileError> {
    let mut declared = Vec::new();

    for (index, raw_line) in text.lines().enumerate() {
        let mut line = raw_line.trim();

        // Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        // Skip options like --extra-index-url
        if line.starts_with('-') {
            continue;
        }
        // Skip line continuations
        if line.ends_with('\\') {
            continue;
        }
        // Drop environment markers
        if let Some((requirement, _marker)) = line.split_once(';') {
            line = requirement.trim();
            if line.is_empty() {
                continue;
            }
        }

        let captures = requirement_re().captures(line).ok_or_else(|| {
            ReconcileError::ManifestParse(format!(
                "requirements line {}: unrecognized syntax {:?}",
                index + 1,
                raw_line,
            ))
        })?;

        let name = captures
            .get(1)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        let spec = captures
            .get(3)
            .map(|m| m.as_str().trim().to_string())
            .filter(|s| !s.is_empty());

        declared.push(Declared {
            name,
            spec,
            dev: false,
        });
    }

    Ok(declared)
}

#[cfg(test)]
#[path = "python_tests.rs"]
mod tests;
