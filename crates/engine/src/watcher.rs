// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Polling file watcher with per-path debounce.
//!
//! Every `scan_interval` the workspace is walked and compared against an
//! in-memory `path → mtime` map. Each detected change arms (or re-arms) a
//! per-path debounce deadline; when the deadline passes the filesystem
//! state is re-verified and exactly one event per debounce window is
//! delivered.

use crate::error::WatchError;
use glob::Pattern;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default workspace scan cadence.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_secs(2);

/// Default per-path quiescent interval before delivery.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_secs(1);

/// A logical file change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileEvent {
    Created,
    Modified,
    Deleted,
}

impl std::fmt::Display for FileEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FileEvent::Created => write!(f, "created"),
            FileEvent::Modified => write!(f, "modified"),
            FileEvent::Deleted => write!(f, "deleted"),
        }
    }
}

/// Watcher settings.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub workspace_root: PathBuf,
    /// Include globs, matched against the workspace-relative path and the
    /// basename.
    pub include: Vec<String>,
    /// Exclude globs, evaluated before includes.
    pub exclude: Vec<String>,
    pub scan_interval: Duration,
    pub debounce: Duration,
}

impl WatcherConfig {
    pub fn new(workspace_root: PathBuf, include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            workspace_root,
            include,
            exclude,
            scan_interval: DEFAULT_SCAN_INTERVAL,
            debounce: DEFAULT_DEBOUNCE,
        }
    }
}

/// Polling scanner that turns filesystem changes into debounced events.
pub struct FileWatcher {
    config: WatcherConfig,
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
}

impl FileWatcher {
    pub fn new(config: WatcherConfig) -> Result<Self, WatchError> {
        let compile = |patterns: &[String]| -> Result<Vec<Pattern>, WatchError> {
            patterns
                .iter()
                .map(|p| {
                    Pattern::new(p).map_err(|source| WatchError::InvalidPattern {
                        pattern: p.clone(),
                        source,
                    })
                })
                .collect()
        };
        Ok(Self {
            include: compile(&config.include)?,
            exclude: compile(&config.exclude)?,
            config,
        })
    }

    fn rel_str(&self, path: &Path) -> String {
        path.strip_prefix(&self.config.workspace_root)
            .unwrap_or(path)
            .display()
            .to_string()
    }

    /// Whether a directory (workspace-relative) is pruned from the walk.
    fn dir_excluded(&self, rel: &str) -> bool {
        self.exclude
            .iter()
            .zip(&self.config.exclude)
            .any(|(pattern, raw)| {
                if pattern.matches(rel) {
                    return true;
                }
                // `node_modules/**` prunes the node_modules directory itself
                raw.strip_suffix("/**")
                    .is_some_and(|prefix| rel == prefix || rel.starts_with(&format!("{prefix}/")))
            })
    }

    /// Whether a file should be tracked. Exclude patterns win; include
    /// patterns match the relative path or the basename.
    pub fn should_track(&self, path: &Path) -> bool {
        let rel = self.rel_str(path);
        if self.exclude.iter().any(|p| p.matches(&rel)) {
            return false;
        }
        let basename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        self.include
            .iter()
            .any(|p| p.matches(&rel) || p.matches(&basename))
    }

    /// Walk the workspace and return all files passing the include/exclude
    /// rules, sorted for deterministic ordering.
    pub fn scan_workspace(&self) -> Vec<PathBuf> {
        let mut found = Vec::new();
        let mut stack = vec![self.config.workspace_root.clone()];

        while let Some(dir) = stack.pop() {
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) => {
                    warn!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                    continue;
                }
            };
            for entry in entries {
                let Ok(entry) = entry else { continue };
                let path = entry.path();
                let Ok(file_type) = entry.file_type() else {
                    warn!(path = %path.display(), "skipping unstattable entry");
                    continue;
                };
                if file_type.is_dir() {
                    if !self.dir_excluded(&self.rel_str(&path)) {
                        stack.push(path);
                    }
                } else if file_type.is_file() && self.should_track(&path) {
                    found.push(path);
                }
            }
        }

        found.sort();
        found
    }

    /// Snapshot mtimes for every currently tracked file.
    fn baseline(&self) -> HashMap<PathBuf, u64> {
        let mut states = HashMap::new();
        for path in self.scan_workspace() {
            match mtime_ms(&path) {
                Some(mtime) => {
                    states.insert(path, mtime);
                }
                None => warn!(path = %path.display(), "could not stat file, skipping"),
            }
        }
        states
    }

    /// One scan pass: emit changes relative to `states` and bring the map
    /// up to date. Updating at emission time means an unchanged file is
    /// emitted once per change, while a genuinely re-modified file re-arms
    /// its debounce deadline.
    fn diff_scan(&self, states: &mut HashMap<PathBuf, u64>) -> Vec<(PathBuf, FileEvent)> {
        let mut changes = Vec::new();
        let mut seen = std::collections::HashSet::new();

        for path in self.scan_workspace() {
            seen.insert(path.clone());
            let Some(mtime) = mtime_ms(&path) else {
                warn!(path = %path.display(), "could not stat file, skipping");
                continue;
            };
            match states.get(&path) {
                None => {
                    debug!(path = %path.display(), "new file detected");
                    states.insert(path.clone(), mtime);
                    changes.push((path, FileEvent::Created));
                }
                Some(&known) if mtime > known => {
                    debug!(path = %path.display(), "modified file detected");
                    states.insert(path.clone(), mtime);
                    changes.push((path, FileEvent::Modified));
                }
                Some(_) => {}
            }
        }

        let deleted: Vec<PathBuf> = states
            .keys()
            .filter(|path| !seen.contains(*path))
            .cloned()
            .collect();
        for path in deleted {
            debug!(path = %path.display(), "deleted file detected");
            states.remove(&path);
            changes.push((path, FileEvent::Deleted));
        }

        changes
    }

    /// Run the watch loop until cancellation, delivering debounced events
    /// on `tx`.
    ///
    /// Cancellation drops all pending debounce deadlines; no final
    /// deliveries occur.
    pub async fn run(self, tx: mpsc::Sender<(PathBuf, FileEvent)>, cancel: CancellationToken) {
        info!(
            root = %self.config.workspace_root.display(),
            "starting file watcher",
        );

        let mut states = self.baseline();
        info!(files = states.len(), "initially tracking files");

        let mut scan_tick = tokio::time::interval(self.config.scan_interval);
        scan_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        // Armed debounce deadlines, one per path
        let mut pending: HashMap<PathBuf, (FileEvent, Instant)> = HashMap::new();

        loop {
            let next_deadline = pending.values().map(|(_, at)| *at).min();
            let sleep_target = next_deadline.unwrap_or_else(Instant::now);

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("file watcher cancelled");
                    return;
                }

                _ = scan_tick.tick() => {
                    let fire_at = Instant::now() + self.config.debounce;
                    for (path, event) in self.diff_scan(&mut states) {
                        // A new emission for a pending path cancels and
                        // restarts its deadline
                        pending.insert(path, (event, fire_at));
                    }
                }

                _ = tokio::time::sleep_until(sleep_target), if next_deadline.is_some() => {
                    let now = Instant::now();
                    let due: Vec<PathBuf> = pending
                        .iter()
                        .filter(|(_, (_, at))| *at <= now)
                        .map(|(path, _)| path.clone())
                        .collect();

                    for path in due {
                        let Some((armed, _)) = pending.remove(&path) else {
                            continue;
                        };

                        // Re-verify filesystem state at delivery time
                        let event = match (path.exists(), armed) {
                            (false, _) => FileEvent::Deleted,
                            (true, FileEvent::Deleted) => FileEvent::Modified,
                            (true, other) => other,
                        };

                        // Correct the map where re-verification changed the
                        // picture (deleted during debounce, or reappeared)
                        match event {
                            FileEvent::Deleted => {
                                states.remove(&path);
                            }
                            _ => {
                                if let Some(mtime) = mtime_ms(&path) {
                                    states.insert(path.clone(), mtime);
                                }
                            }
                        }

                        debug!(path = %path.display(), %event, "delivering file event");
                        if tx.send((path, event)).await.is_err() {
                            info!("event receiver dropped, stopping file watcher");
                            return;
                        }
                    }
                }
            }
        }
    }
}

/// File mtime in epoch milliseconds, `None` on stat failure.
fn mtime_ms(path: &Path) -> Option<u64> {
    let metadata = std::fs::metadata(path).ok()?;
    let modified = metadata.modified().ok()?;
    modified
        .duration_since(std::time::UNIX_EPOCH)
        .ok()
        .map(|d| d.as_millis() as u64)
}

#[cfg(test)]
#[path = "watcher_tests.rs"]
mod tests;
