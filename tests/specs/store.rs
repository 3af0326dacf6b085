// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Durable-store properties observed through the typed API.

use tempfile::TempDir;
use tend_core::{Ecosystem, PackageAction, RestartReason, Task, TaskId, TaskStatus, WatchdogState};
use tend_storage::Store;

fn pending_task(id: &str, created_at_ms: u64) -> Task {
    Task::file_processing(
        TaskId::new(id),
        "/ws/requirements.txt".into(),
        Ecosystem::Python,
        created_at_ms,
    )
}

#[test]
fn reopen_is_identity_on_observable_state() {
    let dir = TempDir::new().unwrap();

    let observable = |store: &Store| {
        (
            store.list_pending_tasks(100),
            store.packages_for(Ecosystem::Python),
            store.packages_for(Ecosystem::JavaScript),
            store.read_watchdog_state(),
            store.restart_events().to_vec(),
        )
    };

    let before = {
        let mut store = Store::open(dir.path(), "service").unwrap();
        store.upsert_task(&pending_task("t-1", 10)).unwrap();
        store.upsert_task(&pending_task("t-2", 20)).unwrap();
        store
            .upsert_package_record(
                Ecosystem::Python,
                "requests",
                std::path::Path::new("/ws"),
                Some(">=2.30"),
                true,
                false,
                PackageAction::Install,
                "ok",
            )
            .unwrap();
        store
            .append_restart_event(RestartReason::Start, None, None)
            .unwrap();
        store
            .write_watchdog_state(WatchdogState {
                restart_count: 1,
                last_restart_secs: 42,
                is_running: true,
            })
            .unwrap();
        observable(&store)
    };

    // Plain reopen (WAL replay)
    let replayed = Store::open(dir.path(), "service").unwrap();
    assert_eq!(observable(&replayed), before);

    // Checkpoint then reopen (snapshot load)
    let mut checkpointed = Store::open(dir.path(), "service").unwrap();
    checkpointed.checkpoint().unwrap();
    drop(checkpointed);
    let from_snapshot = Store::open(dir.path(), "service").unwrap();
    assert_eq!(observable(&from_snapshot), before);
}

#[test]
fn killed_mid_processing_task_is_recovered_to_pending() {
    let dir = TempDir::new().unwrap();

    {
        let mut store = Store::open(dir.path(), "service").unwrap();
        let task = pending_task("t-1", 10);
        store.upsert_task(&task).unwrap();
        store
            .advance_task_status(&task.id, TaskStatus::Processing, None)
            .unwrap();
        // Simulated crash between "task → processing" and completion
    }

    let mut store = Store::open(dir.path(), "service").unwrap();
    // The task is visible as processing after restart…
    assert_eq!(store.state().processing_tasks().len(), 1);
    // …and the documented policy returns it to pending for a retry
    let recovered = store.recover_interrupted_tasks().unwrap();
    assert_eq!(recovered.len(), 1);
    assert_eq!(store.list_pending_tasks(10).len(), 1);
}

#[test]
fn one_package_row_per_name_and_project() {
    let dir = TempDir::new().unwrap();
    let mut store = Store::open(dir.path(), "service").unwrap();
    let project = std::path::Path::new("/ws/app");

    for installed in [false, true, true] {
        store
            .upsert_package_record(
                Ecosystem::Rust,
                "serde",
                project,
                Some("1.0.188"),
                installed,
                false,
                PackageAction::Install,
                "",
            )
            .unwrap();
    }
    // Same name in a different project is a separate row
    store
        .upsert_package_record(
            Ecosystem::Rust,
            "serde",
            std::path::Path::new("/ws/other"),
            Some("1"),
            true,
            false,
            PackageAction::Install,
            "",
        )
        .unwrap();

    assert_eq!(store.packages_for(Ecosystem::Rust).len(), 2);
}

#[test]
fn restart_count_never_decreases_across_lifetimes() {
    let dir = TempDir::new().unwrap();

    let mut observed = Vec::new();
    for count in [1u32, 3, 3, 7] {
        let mut store = Store::open(dir.path(), "watchdog").unwrap();
        let current = store.read_watchdog_state().restart_count;
        store
            .write_watchdog_state(WatchdogState {
                restart_count: count.max(current),
                last_restart_secs: u64::from(count),
                is_running: true,
            })
            .unwrap();
        observed.push(store.read_watchdog_state().restart_count);
    }

    let mut sorted = observed.clone();
    sorted.sort_unstable();
    assert_eq!(observed, sorted, "restart_count regressed: {observed:?}");
}
