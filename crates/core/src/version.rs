// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Ecosystem-aware version comparison.
//!
//! Version-range strings are parsed once into a typed [`VersionSpec`]
//! rather than re-matched on every check. Rules:
//!
//! - Python (PEP 440 subset): `==`, `>=`, `>`, `<`, `<=`, `~=` and
//!   comma-separated conjunctions. Unknown operators degrade to
//!   exact-string equality.
//! - JavaScript (semver subset): exact, `^`, `~`, comparators, with `*`,
//!   `latest`, and empty treated as "any".
//! - Rust: cargo semantics, where a bare version is a caret requirement.
//!
//! Comparison splits on `.`, compares components numerically, strips
//! pre-release/build metadata after `-` or `+`, and treats shorter
//! versions as less than longer versions with an equal prefix.

use crate::ecosystem::Ecosystem;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A parsed version: numeric dot-separated components.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    parts: Vec<u64>,
}

impl Version {
    /// Parse a version string.
    ///
    /// Pre-release and build metadata (after `-` or `+`) are stripped.
    /// A component with trailing non-digits keeps its leading digits and
    /// ends the parse (`1.2.3a1` → `[1, 2, 3]`). Returns `None` when no
    /// leading numeric component exists.
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        let core = trimmed.split(['-', '+']).next().unwrap_or(trimmed);
        let mut parts = Vec::new();
        for comp in core.split('.') {
            let digits: String = comp.chars().take_while(|c| c.is_ascii_digit()).collect();
            if digits.is_empty() {
                break;
            }
            parts.push(digits.parse().ok()?);
            if digits.len() != comp.len() {
                break;
            }
        }
        if parts.is_empty() {
            None
        } else {
            Some(Self { parts })
        }
    }

    pub fn parts(&self) -> &[u64] {
        &self.parts
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        for (a, b) in self.parts.iter().zip(other.parts.iter()) {
            match a.cmp(b) {
                Ordering::Equal => continue,
                non_eq => return non_eq,
            }
        }
        // Equal prefix: shorter sorts before longer
        self.parts.len().cmp(&other.parts.len())
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let rendered: Vec<String> = self.parts.iter().map(|p| p.to_string()).collect();
        write!(f, "{}", rendered.join("."))
    }
}

/// A typed version requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VersionSpec {
    /// Exact version equality (`==1.2.3`, JS `1.2.3`).
    Exact(Version),
    /// Degraded form: unknown operator or unparseable version; satisfied
    /// only by the identical string.
    Literal(String),
    /// `>=`
    AtLeast(Version),
    /// `>`
    Greater(Version),
    /// `<`
    LessThan(Version),
    /// `<=`
    AtMost(Version),
    /// PEP 440 compatible release (`~=X.Y[.Z]`).
    Compatible(Version),
    /// Semver caret range.
    Caret(Version),
    /// Semver tilde range.
    Tilde(Version),
    /// Matches anything (`*`, `latest`, empty JS spec).
    Any,
    /// Conjunction of comma-separated constraints.
    All(Vec<VersionSpec>),
}

impl VersionSpec {
    /// Parse a requirement string for the given ecosystem. Never fails;
    /// unrecognized inputs degrade to [`VersionSpec::Literal`].
    pub fn parse(raw: &str, ecosystem: Ecosystem) -> Self {
        let trimmed = raw.trim();
        if trimmed.contains(',') {
            let parts = trimmed
                .split(',')
                .map(|p| Self::parse_single(p.trim(), ecosystem))
                .collect();
            return VersionSpec::All(parts);
        }
        Self::parse_single(trimmed, ecosystem)
    }

    fn parse_single(s: &str, ecosystem: Ecosystem) -> Self {
        match ecosystem {
            Ecosystem::Python => Self::parse_python(s),
            Ecosystem::JavaScript => Self::parse_semver(s, false),
            Ecosystem::Rust => Self::parse_semver(s, true),
        }
    }

    fn parse_python(s: &str) -> Self {
        let literal = || VersionSpec::Literal(s.to_string());
        if let Some(rest) = s.strip_prefix("~=") {
            return match Version::parse(rest) {
                Some(v) if v.parts().len() >= 2 => VersionSpec::Compatible(v),
                _ => literal(),
            };
        }
        if let Some(rest) = s.strip_prefix("==") {
            // `===` and other arbitrary-equality forms degrade
            if rest.starts_with('=') {
                return literal();
            }
            return Version::parse(rest).map_or_else(literal, VersionSpec::Exact);
        }
        if let Some(rest) = s.strip_prefix(">=") {
            return Version::parse(rest).map_or_else(literal, VersionSpec::AtLeast);
        }
        if let Some(rest) = s.strip_prefix("<=") {
            return Version::parse(rest).map_or_else(literal, VersionSpec::AtMost);
        }
        if let Some(rest) = s.strip_prefix('>') {
            return Version::parse(rest).map_or_else(literal, VersionSpec::Greater);
        }
        if let Some(rest) = s.strip_prefix('<') {
            return Version::parse(rest).map_or_else(literal, VersionSpec::LessThan);
        }
        literal()
    }

    /// Semver-style parsing shared by JavaScript and Rust. With
    /// `bare_is_caret`, a plain version gets cargo's default caret
    /// semantics.
    fn parse_semver(s: &str, bare_is_caret: bool) -> Self {
        let literal = || VersionSpec::Literal(s.to_string());
        if s.is_empty() || s == "*" || s == "x" || s == "latest" {
            return VersionSpec::Any;
        }
        if let Some(rest) = s.strip_prefix('^') {
            return Version::parse(rest).map_or_else(literal, VersionSpec::Caret);
        }
        if let Some(rest) = s.strip_prefix('~') {
            return Version::parse(rest).map_or_else(literal, VersionSpec::Tilde);
        }
        if let Some(rest) = s.strip_prefix(">=") {
            return Version::parse(rest).map_or_else(literal, VersionSpec::AtLeast);
        }
        if let Some(rest) = s.strip_prefix("<=") {
            return Version::parse(rest).map_or_else(literal, VersionSpec::AtMost);
        }
        if let Some(rest) = s.strip_prefix('>') {
            return Version::parse(rest).map_or_else(literal, VersionSpec::Greater);
        }
        if let Some(rest) = s.strip_prefix('<') {
            return Version::parse(rest).map_or_else(literal, VersionSpec::LessThan);
        }
        if let Some(rest) = s.strip_prefix('=') {
            return Version::parse(rest).map_or_else(literal, VersionSpec::Exact);
        }
        match Version::parse(s) {
            Some(v) if bare_is_caret => VersionSpec::Caret(v),
            Some(v) => VersionSpec::Exact(v),
            None => literal(),
        }
    }

    /// Whether `installed` satisfies this requirement.
    ///
    /// Stable: same inputs always produce the same output.
    pub fn satisfies(&self, installed: &str) -> bool {
        match self {
            VersionSpec::Any => true,
            VersionSpec::Literal(s) => installed.trim() == s,
            VersionSpec::All(parts) => parts.iter().all(|p| p.satisfies(installed)),
            _ => {
                let Some(iv) = Version::parse(installed) else {
                    return false;
                };
                match self {
                    VersionSpec::Exact(v) => iv == *v,
                    VersionSpec::AtLeast(v) => iv >= *v,
                    VersionSpec::Greater(v) => iv > *v,
                    VersionSpec::LessThan(v) => iv < *v,
                    VersionSpec::AtMost(v) => iv <= *v,
                    VersionSpec::Compatible(v) => compatible_release(&iv, v),
                    VersionSpec::Caret(v) => caret_satisfies(&iv, v),
                    VersionSpec::Tilde(v) => tilde_satisfies(&iv, v),
                    VersionSpec::Any | VersionSpec::Literal(_) | VersionSpec::All(_) => {
                        // Handled above
                        false
                    }
                }
            }
        }
    }
}

/// PEP 440 `~=X.Y[.Z]`: prefix match of all but the last component, and
/// at least the base version.
fn compatible_release(installed: &Version, base: &Version) -> bool {
    let prefix_len = base.parts().len() - 1;
    installed.parts().len() >= prefix_len
        && installed.parts()[..prefix_len] == base.parts()[..prefix_len]
        && installed >= base
}

/// Semver caret: compatible within the first non-zero component.
///
/// `^1.2.3` → `>=1.2.3, <2.0.0`; `^0.2.3` → `>=0.2.3, <0.3.0`;
/// `^0.0.3` → exact.
fn caret_satisfies(installed: &Version, base: &Version) -> bool {
    match base.parts().iter().position(|&p| p != 0) {
        // All components zero: exact match only
        None => installed == base,
        Some(k) => {
            installed.parts().len() > k
                && installed.parts()[..=k] == base.parts()[..=k]
                && installed >= base
        }
    }
}

/// Semver tilde: patch-level changes. `~1.2.3` → `>=1.2.3, <1.3.0`.
/// A single-component base requires an exact match.
fn tilde_satisfies(installed: &Version, base: &Version) -> bool {
    if base.parts().len() < 2 {
        return installed == base;
    }
    installed.parts().len() >= 2
        && installed.parts()[..2] == base.parts()[..2]
        && installed >= base
}

/// Convenience: parse `spec` for `ecosystem` and check `installed`.
pub fn satisfies(installed: &str, spec: &str, ecosystem: Ecosystem) -> bool {
    VersionSpec::parse(spec, ecosystem).satisfies(installed)
}

#[cfg(test)]
#[path = "version_tests.rs"]
mod tests;
