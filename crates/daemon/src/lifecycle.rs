// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: startup, the main service loop, shutdown.
//!
//! All state is carried by an explicit [`Service`] value constructed at
//! startup; no component reads process-global state after construction.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tend_adapters::{
    Advisor, JavaScriptPackageManager, NoopAdvisor, ProjectLocks, PythonPackageManager,
    RustPackageManager,
};
use tend_core::{epoch_ms, Config, ConfigError, Ecosystem, StatePaths, TrackedFile};
use tend_engine::{
    FileEvent, FileWatcher, Heartbeat, ReconcileHandler, Reconciler, Scheduler, TaskQueue,
    WatchError, WatcherConfig,
};
use tend_storage::{Store, StoreError};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Errors that abort daemon startup or shutdown
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Watch(#[from] WatchError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl LifecycleError {
    /// Whether this failure is a configuration or schema-corruption
    /// problem (exit code 1 per the CLI contract).
    pub fn is_fatal_config(&self) -> bool {
        matches!(
            self,
            LifecycleError::Config(_) | LifecycleError::Store(StoreError::CorruptState(_))
        )
    }
}

/// Checkpoint cadence for the service store.
const CHECKPOINT_INTERVAL: Duration = Duration::from_secs(60);

/// The assembled daemon: configuration, store, and engine components.
pub struct Service {
    pub config: Config,
    pub paths: StatePaths,
    pub workspace_root: PathBuf,
    pub store: Arc<Mutex<Store>>,
    queue: TaskQueue,
    watcher: Option<FileWatcher>,
    scheduler: Option<Scheduler>,
    heartbeat: Option<Heartbeat>,
}

/// Build the service against an explicit state directory.
///
/// Opens the store (schema corruption is fatal), resurrects tasks that
/// were mid-processing when the previous daemon died, and wires the
/// adapters, reconciler, scheduler, watcher, and heartbeat together.
pub fn startup_with(
    paths: StatePaths,
    config_path: &Path,
    advisor: Arc<dyn Advisor>,
) -> Result<Service, LifecycleError> {
    std::fs::create_dir_all(&paths.data_dir)?;

    let config = Config::load_or_init(config_path)?;
    let cwd = std::env::current_dir()?;
    let workspace_root = config.resolve_workspace_root(&cwd);
    info!(root = %workspace_root.display(), "using workspace root");

    let mut store = Store::open(&paths.data_dir, "service")?;
    let recovered = store.recover_interrupted_tasks()?;
    if !recovered.is_empty() {
        info!(count = recovered.len(), "requeued interrupted tasks");
    }
    let store = Arc::new(Mutex::new(store));

    let locks = ProjectLocks::new();
    let reconciler = Reconciler::new(Arc::clone(&store), advisor)
        .with_manager(Arc::new(PythonPackageManager::new(locks.clone())))
        .with_manager(Arc::new(JavaScriptPackageManager::new(locks.clone())))
        .with_manager(Arc::new(RustPackageManager::new(locks)));
    let handler = Arc::new(ReconcileHandler::new(reconciler));

    let queue = TaskQueue::new(Arc::clone(&store));
    let scheduler = Scheduler::new(Arc::clone(&store), handler);

    let watcher = FileWatcher::new(WatcherConfig::new(
        workspace_root.clone(),
        config.file_patterns.clone(),
        config.ignore_patterns.clone(),
    ))?;

    let heartbeat = Heartbeat::new(
        paths.heartbeat(),
        paths.pid(),
        Duration::from_secs(config.watchdog.heartbeat_interval.max(1)),
    );

    Ok(Service {
        config,
        paths,
        workspace_root,
        store,
        queue,
        watcher: Some(watcher),
        scheduler: Some(scheduler),
        heartbeat: Some(heartbeat),
    })
}

/// Build the service from the default state directory, with the config
/// path optionally overridden on the command line.
pub fn startup(config_override: Option<PathBuf>) -> Result<Service, LifecycleError> {
    let paths = StatePaths::resolve()?;
    let config_path = config_override.unwrap_or_else(|| paths.config());
    startup_with(paths, &config_path, Arc::new(NoopAdvisor))
}

impl Service {
    /// Record a delivered watcher event: track or purge the file, and
    /// enqueue reconciliation when a handler owns it.
    pub fn handle_file_event(&self, path: PathBuf, event: FileEvent) {
        info!(path = %path.display(), %event, "file change detected");

        if event == FileEvent::Deleted {
            if let Err(e) = self.store.lock().purge_tracked_file(&path) {
                error!(path = %path.display(), error = %e, "failed to purge tracked file");
            }
            return;
        }

        let ecosystem = Ecosystem::from_manifest_path(&path);
        let mtime_ms = std::fs::metadata(&path)
            .ok()
            .and_then(|m| m.modified().ok())
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_millis() as u64)
            .unwrap_or_else(epoch_ms);

        if let Err(e) = self.store.lock().record_tracked_file(&TrackedFile {
            path: path.clone(),
            mtime_ms,
            processed_at_ms: Some(epoch_ms()),
            ecosystem,
        }) {
            error!(path = %path.display(), error = %e, "failed to record tracked file");
        }

        match ecosystem {
            Some(ecosystem) => {
                if let Err(e) = self.queue.enqueue_file_task(path.clone(), ecosystem) {
                    error!(path = %path.display(), error = %e, "failed to enqueue task");
                }
            }
            None => debug!(path = %path.display(), "no handler for file, tracked only"),
        }
    }

    /// Enqueue every manifest currently in the workspace.
    fn initial_scan(&self, watcher: &FileWatcher) {
        let files = watcher.scan_workspace();
        info!(count = files.len(), "initial workspace scan");
        for path in files {
            self.handle_file_event(path, FileEvent::Created);
        }
    }

    /// Run the daemon until cancellation: heartbeat, watcher, scheduler,
    /// and the event-intake loop, all on one cooperative runtime.
    pub async fn run(mut self, cancel: CancellationToken) -> Result<(), LifecycleError> {
        let heartbeat = self.heartbeat.take();
        let scheduler = self.scheduler.take();
        let watcher = self.watcher.take();

        let heartbeat_task = heartbeat.map(|h| tokio::spawn(h.run(cancel.clone())));
        let scheduler_task = scheduler.map(|s| tokio::spawn(s.run(cancel.clone())));

        let (tx, mut rx) = mpsc::channel(64);
        let watcher_task = watcher.map(|w| {
            self.initial_scan(&w);
            tokio::spawn(w.run(tx, cancel.clone()))
        });

        let mut checkpoint_tick = tokio::time::interval(CHECKPOINT_INTERVAL);
        checkpoint_tick.tick().await; // first tick is immediate

        info!("daemon ready");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                event = rx.recv() => {
                    match event {
                        Some((path, event)) => self.handle_file_event(path, event),
                        None => {
                            warn!("watcher channel closed");
                            break;
                        }
                    }
                }

                _ = checkpoint_tick.tick() => {
                    if let Err(e) = self.store.lock().checkpoint() {
                        warn!(error = %e, "periodic checkpoint failed");
                    }
                }
            }
        }

        info!("shutting down daemon");
        // Covers the watcher-channel-closed exit path as well
        cancel.cancel();
        // Scheduler drains in-flight tasks; watcher drops pending timers;
        // heartbeat writes its final SHUTDOWN marker.
        if let Some(task) = watcher_task {
            if let Err(e) = task.await {
                warn!(error = %e, "watcher task aborted");
            }
        }
        if let Some(task) = scheduler_task {
            if let Err(e) = task.await {
                warn!(error = %e, "scheduler task aborted");
            }
        }
        if let Some(task) = heartbeat_task {
            if let Err(e) = task.await {
                warn!(error = %e, "heartbeat task aborted");
            }
        }

        if let Err(e) = self.store.lock().checkpoint() {
            warn!(error = %e, "final checkpoint failed");
        }
        info!("daemon stopped");
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
