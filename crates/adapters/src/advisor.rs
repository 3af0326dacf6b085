// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dependency-advisor interface.
//!
//! The advisor (an LLM in the original deployment) is an external
//! collaborator: the engine submits reconciliation results through this
//! narrow trait, tolerates its absence, and never blocks on it beyond a
//! best-effort timeout.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tend_core::{ActionRecord, Ecosystem};
use thiserror::Error;

/// Errors an advisor implementation may surface.
///
/// All of them are swallowed by the caller; they exist so implementations
/// can be honest about what went wrong in debug logs.
#[derive(Debug, Error)]
pub enum AdvisorError {
    #[error("advisor unavailable: {0}")]
    Unavailable(String),
    #[error("advisor failed: {0}")]
    Failed(String),
}

/// One advisor suggestion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Structured advisor output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AdvisorReport {
    #[serde(default)]
    pub missing_dependencies: Vec<Suggestion>,
    #[serde(default)]
    pub updates: Vec<Suggestion>,
    #[serde(default)]
    pub security_issues: Vec<Suggestion>,
    #[serde(default)]
    pub compatibility_issues: Vec<Suggestion>,
}

impl AdvisorReport {
    pub fn is_empty(&self) -> bool {
        self.missing_dependencies.is_empty()
            && self.updates.is_empty()
            && self.security_issues.is_empty()
            && self.compatibility_issues.is_empty()
    }
}

/// External dependency advisor.
#[async_trait]
pub trait Advisor: Send + Sync {
    /// Analyze the outcome of one reconciliation pass.
    async fn analyze(
        &self,
        actions: &[ActionRecord],
        manifest_text: &str,
        ecosystem: Ecosystem,
    ) -> Result<AdvisorReport, AdvisorError>;
}

/// Advisor wiring for deployments without an LLM: always returns an
/// empty report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAdvisor;

#[async_trait]
impl Advisor for NoopAdvisor {
    async fn analyze(
        &self,
        _actions: &[ActionRecord],
        _manifest_text: &str,
        _ecosystem: Ecosystem,
    ) -> Result<AdvisorReport, AdvisorError> {
        Ok(AdvisorReport::default())
    }
}

#[cfg(any(test, feature = "test-support"))]
pub mod fake {
    //! Fake advisor for testing
    #![cfg_attr(coverage_nightly, coverage(off))]

    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::time::Duration;

    /// Recorded analyze call
    #[derive(Debug, Clone)]
    pub struct AnalyzeCall {
        pub actions: Vec<ActionRecord>,
        pub manifest_text: String,
        pub ecosystem: Ecosystem,
    }

    struct FakeAdvisorState {
        calls: Vec<AnalyzeCall>,
        report: AdvisorReport,
        fail: bool,
        delay: Option<Duration>,
    }

    /// Fake advisor recording calls with a configurable response.
    #[derive(Clone)]
    pub struct FakeAdvisor {
        inner: Arc<Mutex<FakeAdvisorState>>,
    }

    impl Default for FakeAdvisor {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeAdvisorState {
                    calls: Vec::new(),
                    report: AdvisorReport::default(),
                    fail: false,
                    delay: None,
                })),
            }
        }
    }

    impl FakeAdvisor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond_with(&self, report: AdvisorReport) {
            self.inner.lock().report = report;
        }

        pub fn fail(&self) {
            self.inner.lock().fail = true;
        }

        /// Delay every response, for exercising the caller's timeout.
        pub fn delay(&self, delay: Duration) {
            self.inner.lock().delay = Some(delay);
        }

        pub fn calls(&self) -> Vec<AnalyzeCall> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl Advisor for FakeAdvisor {
        async fn analyze(
            &self,
            actions: &[ActionRecord],
            manifest_text: &str,
            ecosystem: Ecosystem,
        ) -> Result<AdvisorReport, AdvisorError> {
            let (delay, fail, report) = {
                let mut state = self.inner.lock();
                state.calls.push(AnalyzeCall {
                    actions: actions.to_vec(),
                    manifest_text: manifest_text.to_string(),
                    ecosystem,
                });
                (state.delay, state.fail, state.report.clone())
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            if fail {
                return Err(AdvisorError::Failed("fake advisor failure".to_string()));
            }
            Ok(report)
        }
    }
}

#[cfg(test)]
#[path = "advisor_tests.rs"]
mod tests;
