// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reconciliation scenarios against fake adapters.

use parking_lot::Mutex;
use std::sync::Arc;
use tempfile::TempDir;
use tend_adapters::{FakeAdvisor, FakePackageManager};
use tend_core::{Ecosystem, PackageAction};
use tend_engine::Reconciler;
use tend_storage::Store;

struct World {
    _state_dir: TempDir,
    workspace: TempDir,
    store: Arc<Mutex<Store>>,
    manager: FakePackageManager,
    advisor: FakeAdvisor,
}

impl World {
    fn new(ecosystem: Ecosystem) -> Self {
        let state_dir = TempDir::new().unwrap();
        let store = Arc::new(Mutex::new(Store::open(state_dir.path(), "service").unwrap()));
        Self {
            _state_dir: state_dir,
            workspace: TempDir::new().unwrap(),
            store,
            manager: FakePackageManager::new(ecosystem),
            advisor: FakeAdvisor::new(),
        }
    }

    fn reconciler(&self) -> Reconciler {
        Reconciler::new(Arc::clone(&self.store), Arc::new(self.advisor.clone()))
            .with_manager(Arc::new(self.manager.clone()))
    }

    fn manifest(&self, name: &str, content: &str) -> std::path::PathBuf {
        let path = self.workspace.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }
}

/// S1: a declared Python package that is not installed gets installed and
/// recorded; re-running on the unchanged manifest installs nothing new.
#[tokio::test]
async fn python_add_then_stable() {
    let world = World::new(Ecosystem::Python);
    let manifest = world.manifest("requirements.txt", "requests>=2.30\n");
    let reconciler = world.reconciler();

    reconciler
        .reconcile(&manifest, Ecosystem::Python)
        .await
        .unwrap();

    let installs = world.manager.install_calls();
    assert_eq!(installs.len(), 1);
    assert_eq!(installs[0].name, "requests");
    assert_eq!(installs[0].spec.as_deref(), Some(">=2.30"));

    let records = world.store.lock().packages_for(Ecosystem::Python);
    assert_eq!(records.len(), 1);
    assert!(records[0].installed);

    // Unchanged manifest: zero install or upgrade actions
    let second = reconciler
        .reconcile(&manifest, Ecosystem::Python)
        .await
        .unwrap();
    assert_eq!(second.attempted(), 0);
    assert_eq!(world.manager.install_calls().len(), 1);
}

/// S2: a caret spec already satisfied by the installed version makes no
/// subprocess install call.
#[tokio::test]
async fn js_caret_satisfied() {
    let world = World::new(Ecosystem::JavaScript);
    std::fs::create_dir(world.workspace.path().join("node_modules")).unwrap();
    let manifest = world.manifest("package.json", r#"{"dependencies": {"lodash": "^4.17.0"}}"#);
    world.manager.set_installed("lodash", "4.17.21");

    let summary = world
        .reconciler()
        .reconcile(&manifest, Ecosystem::JavaScript)
        .await
        .unwrap();

    assert_eq!(summary.actions[0].action, PackageAction::None);
    assert!(world.manager.install_calls().is_empty());
}

/// S3: a Cargo dependency whose recorded version no longer satisfies the
/// declared requirement is upgraded via `cargo add`.
#[tokio::test]
async fn rust_upgrade() {
    let world = World::new(Ecosystem::Rust);
    let manifest = world.manifest("Cargo.toml", "[dependencies]\nserde = \"1.0.188\"\n");
    world.manager.set_installed("serde", "1.0.150");

    let summary = world
        .reconciler()
        .reconcile(&manifest, Ecosystem::Rust)
        .await
        .unwrap();

    assert_eq!(summary.actions[0].action, PackageAction::Upgrade);
    let installs = world.manager.install_calls();
    assert_eq!(installs.len(), 1);
    assert_eq!(installs[0].name, "serde");
    assert_eq!(installs[0].spec.as_deref(), Some("1.0.188"));
}

/// Boundary: an empty manifest produces an empty action list and no
/// adapter calls at all.
#[tokio::test]
async fn empty_manifest_is_inert() {
    let world = World::new(Ecosystem::Python);
    let manifest = world.manifest("requirements.txt", "# nothing\n\n");

    let summary = world
        .reconciler()
        .reconcile(&manifest, Ecosystem::Python)
        .await
        .unwrap();

    assert!(summary.actions.is_empty());
    assert!(world.manager.calls().is_empty());
}

/// The advisor sees the full action list but its failures never surface.
#[tokio::test]
async fn advisor_is_best_effort() {
    let world = World::new(Ecosystem::Python);
    let manifest = world.manifest("requirements.txt", "requests>=2.30\nflask==3.0.0\n");

    world
        .reconciler()
        .reconcile(&manifest, Ecosystem::Python)
        .await
        .unwrap();
    assert_eq!(world.advisor.calls()[0].actions.len(), 2);

    world.advisor.fail();
    world
        .reconciler()
        .reconcile(&manifest, Ecosystem::Python)
        .await
        .unwrap();
}
