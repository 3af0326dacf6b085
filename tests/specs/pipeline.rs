// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end through the engine: watcher → queue → scheduler →
//! reconciler, with fake adapters behind the real store.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tend_adapters::{FakeAdvisor, FakePackageManager};
use tend_core::{Ecosystem, TaskStatus};
use tend_engine::{
    FileWatcher, ReconcileHandler, Reconciler, Scheduler, TaskQueue, WatcherConfig,
};
use tend_storage::Store;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct World {
    _state_dir: TempDir,
    workspace: TempDir,
    store: Arc<Mutex<Store>>,
    manager: FakePackageManager,
    queue: TaskQueue,
}

impl World {
    fn new(ecosystem: Ecosystem) -> Self {
        let state_dir = TempDir::new().unwrap();
        let store = Arc::new(Mutex::new(Store::open(state_dir.path(), "service").unwrap()));
        Self {
            _state_dir: state_dir,
            workspace: TempDir::new().unwrap(),
            queue: TaskQueue::new(Arc::clone(&store)),
            store,
            manager: FakePackageManager::new(ecosystem),
        }
    }

    fn handler(&self) -> Arc<ReconcileHandler> {
        let reconciler = Reconciler::new(Arc::clone(&self.store), Arc::new(FakeAdvisor::new()))
            .with_manager(Arc::new(self.manager.clone()));
        Arc::new(ReconcileHandler::new(reconciler))
    }

    fn watcher(&self) -> FileWatcher {
        let mut config = WatcherConfig::new(
            self.workspace.path().to_owned(),
            vec![
                "requirements.txt".to_string(),
                "package.json".to_string(),
                "Cargo.toml".to_string(),
            ],
            vec!["node_modules/**".to_string()],
        );
        config.scan_interval = Duration::from_millis(50);
        config.debounce = Duration::from_millis(150);
        FileWatcher::new(config).unwrap()
    }

    async fn wait_until(&self, what: &str, predicate: impl Fn(&Store) -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if predicate(&self.store.lock()) {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {what}"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

/// A manifest change flows from the watcher through the queue to a
/// completed reconciliation with a recorded package row.
#[tokio::test]
async fn change_flows_to_completed_task() {
    let world = World::new(Ecosystem::Python);
    let cancel = CancellationToken::new();

    let (tx, mut rx) = mpsc::channel(16);
    let watcher_task = tokio::spawn(world.watcher().run(tx, cancel.clone()));

    let scheduler = Scheduler::new(Arc::clone(&world.store), world.handler())
        .with_poll_interval(Duration::from_millis(20));
    let scheduler_task = tokio::spawn(scheduler.run(cancel.clone()));

    // Intake loop: deliveries become durable tasks
    let queue = world.queue.clone();
    let intake = tokio::spawn(async move {
        while let Some((path, _event)) = rx.recv().await {
            if let Some(eco) = tend_core::Ecosystem::from_manifest_path(&path) {
                queue.enqueue_file_task(path, eco).unwrap();
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(80)).await;
    std::fs::write(
        world.workspace.path().join("requirements.txt"),
        "requests>=2.30\n",
    )
    .unwrap();

    world
        .wait_until("task completion", |store| {
            store
                .state()
                .tasks
                .values()
                .any(|t| t.status == TaskStatus::Completed)
        })
        .await;

    let installs = world.manager.install_calls();
    assert_eq!(installs.len(), 1);
    assert_eq!(installs[0].name, "requests");
    assert_eq!(installs[0].project_path, world.workspace.path());

    let records = world.store.lock().packages_for(Ecosystem::Python);
    assert_eq!(records.len(), 1);
    assert!(records[0].installed);

    cancel.cancel();
    watcher_task.await.unwrap();
    scheduler_task.await.unwrap();
    intake.await.unwrap();
}

/// S4 / boundary 10: a manifest touched several times within one debounce
/// window produces exactly one task.
#[tokio::test]
async fn rapid_touches_enqueue_exactly_one_task() {
    let world = World::new(Ecosystem::JavaScript);
    let manifest = world.workspace.path().join("package.json");
    std::fs::write(&manifest, "{}").unwrap();

    let cancel = CancellationToken::new();
    let (tx, mut rx) = mpsc::channel(16);
    let watcher_task = tokio::spawn(world.watcher().run(tx, cancel.clone()));

    let queue = world.queue.clone();
    let intake = tokio::spawn(async move {
        while let Some((path, _event)) = rx.recv().await {
            if let Some(eco) = tend_core::Ecosystem::from_manifest_path(&path) {
                queue.enqueue_file_task(path, eco).unwrap();
            }
        }
    });

    tokio::time::sleep(Duration::from_millis(80)).await;
    for n in 0..5 {
        std::fs::write(&manifest, format!("{{\"touch\": {n}}}")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    world
        .wait_until("the coalesced task", |store| !store.state().tasks.is_empty())
        .await;
    // Allow any spurious extra deliveries to surface before counting
    tokio::time::sleep(Duration::from_millis(400)).await;

    assert_eq!(world.store.lock().state().tasks.len(), 1);

    cancel.cancel();
    watcher_task.await.unwrap();
    intake.await.unwrap();
}

/// Invariant 3: in-flight tasks never exceed the scheduler bound even
/// with a backlog.
#[tokio::test]
async fn scheduler_respects_concurrency_bound() {
    let world = World::new(Ecosystem::Python);
    for n in 0..8 {
        let dir = world.workspace.path().join(format!("proj{n}"));
        std::fs::create_dir_all(&dir).unwrap();
        let manifest = dir.join("requirements.txt");
        std::fs::write(&manifest, "requests>=2.30\n").unwrap();
        world
            .queue
            .enqueue_file_task(manifest, Ecosystem::Python)
            .unwrap();
    }

    let cancel = CancellationToken::new();
    let scheduler = Scheduler::new(Arc::clone(&world.store), world.handler())
        .with_poll_interval(Duration::from_millis(20))
        .with_concurrency(2);
    let scheduler_task = tokio::spawn(scheduler.run(cancel.clone()));

    // Observe the processing count while the backlog drains
    let mut max_processing = 0;
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let (processing, done) = {
            let store = world.store.lock();
            let state = store.state();
            (
                state.processing_tasks().len(),
                state
                    .tasks
                    .values()
                    .filter(|t| t.status.is_terminal())
                    .count(),
            )
        };
        max_processing = max_processing.max(processing);
        if done == 8 {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "backlog did not drain"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    assert!(
        max_processing <= 2,
        "observed {max_processing} concurrent tasks"
    );

    cancel.cancel();
    scheduler_task.await.unwrap();
}
