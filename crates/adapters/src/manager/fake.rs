// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake package manager for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{InstallOutcome, InstallRequest, OutdatedPackage, PackageManager};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tend_core::Ecosystem;

/// Recorded adapter invocation
#[derive(Debug, Clone, PartialEq)]
pub enum FakeCall {
    Install(InstallRequest),
    ListInstalled,
    InstallAll,
    Outdated,
}

struct FakeState {
    calls: Vec<FakeCall>,
    installed: HashMap<String, String>,
    fail_installs: bool,
    supports_install_all: bool,
}

/// Fake package manager recording calls and serving a configurable
/// installed set.
#[derive(Clone)]
pub struct FakePackageManager {
    ecosystem: Ecosystem,
    inner: Arc<Mutex<FakeState>>,
}

impl FakePackageManager {
    pub fn new(ecosystem: Ecosystem) -> Self {
        Self {
            ecosystem,
            inner: Arc::new(Mutex::new(FakeState {
                calls: Vec::new(),
                installed: HashMap::new(),
                fail_installs: false,
                supports_install_all: false,
            })),
        }
    }

    /// Seed the installed set reported by `list_installed`.
    pub fn set_installed(&self, name: &str, version: &str) {
        self.inner
            .lock()
            .installed
            .insert(name.to_string(), version.to_string());
    }

    /// Make every install invocation return a non-zero outcome.
    pub fn fail_installs(&self) {
        self.inner.lock().fail_installs = true;
    }

    /// Enable the full-install operation (JavaScript-style).
    pub fn support_install_all(&self) {
        self.inner.lock().supports_install_all = true;
    }

    /// All recorded invocations, in order.
    pub fn calls(&self) -> Vec<FakeCall> {
        self.inner.lock().calls.clone()
    }

    /// Only the install invocations.
    pub fn install_calls(&self) -> Vec<InstallRequest> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                FakeCall::Install(req) => Some(req.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl PackageManager for FakePackageManager {
    fn ecosystem(&self) -> Ecosystem {
        self.ecosystem
    }

    async fn install(&self, request: &InstallRequest) -> InstallOutcome {
        let mut state = self.inner.lock();
        state.calls.push(FakeCall::Install(request.clone()));
        if state.fail_installs {
            return InstallOutcome::failure("fake install failure");
        }
        // Mirror a successful install into the installed set; operators are
        // stripped so the recorded version satisfies the requested spec
        let version = request
            .spec
            .as_deref()
            .map(|s| s.trim_start_matches(['=', '<', '>', '~', '^', '!', ' ']).to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "0.0.0".to_string());
        state.installed.insert(request.name.clone(), version);
        InstallOutcome {
            ok: true,
            output: format!("fake install of {}", request.name),
        }
    }

    async fn list_installed(&self, _project_path: &Path) -> HashMap<String, String> {
        let mut state = self.inner.lock();
        state.calls.push(FakeCall::ListInstalled);
        state.installed.clone()
    }

    async fn install_all(&self, _project_path: &Path) -> Option<InstallOutcome> {
        let mut state = self.inner.lock();
        if !state.supports_install_all {
            return None;
        }
        state.calls.push(FakeCall::InstallAll);
        Some(InstallOutcome {
            ok: true,
            output: "fake full install".to_string(),
        })
    }

    async fn outdated(&self, _project_path: &Path) -> Vec<OutdatedPackage> {
        self.inner.lock().calls.push(FakeCall::Outdated);
        Vec::new()
    }
}

#[cfg(test)]
#[path = "fake_tests.rs"]
mod tests;
