// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service configuration and filesystem layout.
//!
//! The config file is JSON; a default is written on first start. The state
//! directory holds every durable artifact the service touches.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors loading or writing configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("no state directory available")]
    NoStateDir,
}

/// Advisor (LLM) settings. The engine itself is an external collaborator;
/// only its identity lives in config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub model_path: String,
    pub quantization: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model_path: "TinyLlama/TinyLlama-1.1B-Chat-v1.0".to_string(),
            quantization: "q4_k_m".to_string(),
        }
    }
}

/// Supervisor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchdogConfig {
    /// How often the supervisor checks daemon health, in seconds.
    pub check_interval: u64,
    /// How often the daemon writes its heartbeat, in seconds.
    pub heartbeat_interval: u64,
    /// Maximum restarts before giving up; 0 = unlimited.
    #[serde(default)]
    pub max_restart_attempts: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            check_interval: 10,
            heartbeat_interval: 5,
            max_restart_attempts: 0,
        }
    }
}

/// Service configuration, loaded from JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Globs selecting manifest files to watch.
    pub file_patterns: Vec<String>,
    /// Globs excluding paths from watching; evaluated before includes.
    pub ignore_patterns: Vec<String>,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub watchdog: WatchdogConfig,
    /// Workspace root; `None` auto-detects by walking up to the first VCS
    /// directory.
    #[serde(default)]
    pub workspace_root: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file_patterns: vec![
                "requirements.txt".to_string(),
                "package.json".to_string(),
                "Cargo.toml".to_string(),
                "*.csproj".to_string(),
                "build.gradle".to_string(),
            ],
            ignore_patterns: vec![
                "node_modules/**".to_string(),
                ".git/**".to_string(),
                "__pycache__/**".to_string(),
                "dist/**".to_string(),
                "build/**".to_string(),
                "target/**".to_string(),
            ],
            llm: LlmConfig::default(),
            watchdog: WatchdogConfig::default(),
            workspace_root: None,
        }
    }
}

impl Config {
    /// Load config from `path`, writing the default file first when absent.
    pub fn load_or_init(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            let config = Self::default();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let rendered = serde_json::to_string_pretty(&config).map_err(|source| {
                ConfigError::Parse {
                    path: path.to_owned(),
                    source,
                }
            })?;
            std::fs::write(path, rendered)?;
            return Ok(config);
        }

        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Resolve the workspace root: the configured value, or the nearest
    /// ancestor of `cwd` containing a VCS directory, falling back to `cwd`.
    pub fn resolve_workspace_root(&self, cwd: &Path) -> PathBuf {
        if let Some(root) = &self.workspace_root {
            return root.clone();
        }
        let mut path = cwd;
        loop {
            for vcs in [".git", ".svn", ".hg"] {
                if path.join(vcs).is_dir() {
                    return path.to_owned();
                }
            }
            match path.parent() {
                Some(parent) => path = parent,
                None => return cwd.to_owned(),
            }
        }
    }
}

/// Filesystem layout under the service's state directory.
#[derive(Debug, Clone)]
pub struct StatePaths {
    pub data_dir: PathBuf,
}

impl StatePaths {
    /// Resolve the state directory: `$TEND_STATE_DIR`, or
    /// `~/.local/state/tend`.
    pub fn resolve() -> Result<Self, ConfigError> {
        if let Ok(dir) = std::env::var("TEND_STATE_DIR") {
            if !dir.is_empty() {
                return Ok(Self {
                    data_dir: PathBuf::from(dir),
                });
            }
        }
        let base = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or(ConfigError::NoStateDir)?;
        Ok(Self {
            data_dir: base.join("tend"),
        })
    }

    pub fn at(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Default config file location.
    pub fn config(&self) -> PathBuf {
        self.data_dir.join("service.json")
    }

    /// Heartbeat timestamp file, written by the daemon, read by the
    /// supervisor.
    pub fn heartbeat(&self) -> PathBuf {
        self.data_dir.join("heartbeat")
    }

    /// Daemon PID file.
    pub fn pid(&self) -> PathBuf {
        self.data_dir.join("service.pid")
    }

    /// Daemon stdout log (supervisor-managed).
    pub fn service_log(&self) -> PathBuf {
        self.data_dir.join("service.log")
    }

    /// Daemon stderr log (supervisor-managed).
    pub fn error_log(&self) -> PathBuf {
        self.data_dir.join("service_error.log")
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
