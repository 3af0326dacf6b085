// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tend_core::{PackageAction, RestartReason, TaskId};

fn enqueue(state: &mut MaterializedState, id: &str, created_at_ms: u64) {
    state.apply_event(&Event::TaskEnqueued {
        id: TaskId::new(id),
        path: "/ws/requirements.txt".into(),
        ecosystem: Ecosystem::Python,
        created_at_ms,
    });
}

fn advance(state: &mut MaterializedState, id: &str, status: TaskStatus) {
    state.apply_event(&Event::TaskStatusChanged {
        id: TaskId::new(id),
        status,
        error: None,
        at_ms: 999,
    });
}

#[test]
fn enqueue_creates_pending_task() {
    let mut state = MaterializedState::default();
    enqueue(&mut state, "t-1", 10);

    let task = state.get_task("t-1").unwrap();
    assert_eq!(task.status, TaskStatus::Pending);
    assert_eq!(task.created_at_ms, 10);
}

#[test]
fn duplicate_enqueue_is_ignored() {
    let mut state = MaterializedState::default();
    enqueue(&mut state, "t-1", 10);
    advance(&mut state, "t-1", TaskStatus::Processing);
    // Replaying the same enqueue must not reset the task
    enqueue(&mut state, "t-1", 10);
    assert_eq!(state.get_task("t-1").unwrap().status, TaskStatus::Processing);
}

#[test]
fn pending_tasks_ordered_by_created_at() {
    let mut state = MaterializedState::default();
    enqueue(&mut state, "t-later", 30);
    enqueue(&mut state, "t-early", 10);
    enqueue(&mut state, "t-mid", 20);

    let pending = state.pending_tasks(10);
    let ids: Vec<&str> = pending.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["t-early", "t-mid", "t-later"]);

    let limited = state.pending_tasks(2);
    assert_eq!(limited.len(), 2);
}

#[test]
fn status_sequence_is_monotonic() {
    let mut state = MaterializedState::default();
    enqueue(&mut state, "t-1", 10);

    advance(&mut state, "t-1", TaskStatus::Processing);
    advance(&mut state, "t-1", TaskStatus::Completed);
    assert_eq!(state.get_task("t-1").unwrap().status, TaskStatus::Completed);

    // A task never moves back from completed
    advance(&mut state, "t-1", TaskStatus::Pending);
    advance(&mut state, "t-1", TaskStatus::Failed);
    assert_eq!(state.get_task("t-1").unwrap().status, TaskStatus::Completed);
}

#[test]
fn failed_records_error_string() {
    let mut state = MaterializedState::default();
    enqueue(&mut state, "t-1", 10);
    advance(&mut state, "t-1", TaskStatus::Processing);
    state.apply_event(&Event::TaskStatusChanged {
        id: TaskId::new("t-1"),
        status: TaskStatus::Failed,
        error: Some("manifest parse: line 3".to_string()),
        at_ms: 50,
    });

    let task = state.get_task("t-1").unwrap();
    assert_eq!(task.status, TaskStatus::Failed);
    assert_eq!(task.error.as_deref(), Some("manifest parse: line 3"));
    assert_eq!(task.updated_at_ms, 50);
}

#[test]
fn processing_tasks_surface_interrupted_work() {
    let mut state = MaterializedState::default();
    enqueue(&mut state, "t-1", 10);
    enqueue(&mut state, "t-2", 20);
    advance(&mut state, "t-1", TaskStatus::Processing);

    let processing = state.processing_tasks();
    assert_eq!(processing.len(), 1);
    assert_eq!(processing[0].id.as_str(), "t-1");
}

#[test]
fn tracked_file_updates_and_removal() {
    let mut state = MaterializedState::default();
    let path = PathBuf::from("/ws/package.json");

    state.apply_event(&Event::FileTracked {
        path: path.clone(),
        mtime_ms: 100,
        processed_at_ms: None,
        ecosystem: Some(Ecosystem::JavaScript),
    });
    state.apply_event(&Event::FileTracked {
        path: path.clone(),
        mtime_ms: 200,
        processed_at_ms: Some(250),
        ecosystem: Some(Ecosystem::JavaScript),
    });

    let tracked = state.tracked_files.get(&path).unwrap();
    assert_eq!(tracked.mtime_ms, 200);
    assert_eq!(tracked.processed_at_ms, Some(250));

    state.apply_event(&Event::FileRemoved { path: path.clone() });
    assert!(state.tracked_files.is_empty());
}

#[test]
fn package_records_upsert_by_name_and_project() {
    let mut state = MaterializedState::default();
    let record = |installed: bool| PackageRecord {
        name: "requests".to_string(),
        project_path: "/ws/app".into(),
        spec: Some(">=2.30".to_string()),
        installed,
        dev: false,
        last_action: PackageAction::Install,
        last_action_ms: 1,
        log: String::new(),
    };

    state.apply_event(&Event::PackageRecorded {
        ecosystem: Ecosystem::Python,
        record: record(false),
    });
    state.apply_event(&Event::PackageRecorded {
        ecosystem: Ecosystem::Python,
        record: record(true),
    });

    // At most one row per (name, project_path)
    let partition = state.packages_for(Ecosystem::Python).unwrap();
    assert_eq!(partition.len(), 1);
    assert!(partition.values().next().unwrap().installed);
}

#[test]
fn ecosystem_partitions_are_independent() {
    let mut state = MaterializedState::default();
    for eco in [Ecosystem::Python, Ecosystem::Rust] {
        state.apply_event(&Event::PackageRecorded {
            ecosystem: eco,
            record: PackageRecord {
                name: "serde".to_string(),
                project_path: "/ws".into(),
                spec: None,
                installed: true,
                dev: false,
                last_action: PackageAction::Install,
                last_action_ms: 1,
                log: String::new(),
            },
        });
    }
    assert_eq!(state.packages_for(Ecosystem::Python).unwrap().len(), 1);
    assert_eq!(state.packages_for(Ecosystem::Rust).unwrap().len(), 1);
    assert!(state.packages_for(Ecosystem::JavaScript).is_none());
}

#[test]
fn restart_events_append_and_watchdog_state_replaces() {
    let mut state = MaterializedState::default();
    state.apply_event(&Event::RestartRecorded {
        event: RestartEvent {
            at_ms: 1,
            reason: RestartReason::Start,
            exit_code: None,
            log_excerpt: None,
        },
    });
    state.apply_event(&Event::RestartRecorded {
        event: RestartEvent {
            at_ms: 2,
            reason: RestartReason::ExitNonzero,
            exit_code: Some(1),
            log_excerpt: None,
        },
    });
    assert_eq!(state.restart_events.len(), 2);

    state.apply_event(&Event::WatchdogStateWritten {
        state: WatchdogState {
            restart_count: 2,
            last_restart_secs: 99,
            is_running: true,
        },
    });
    assert_eq!(state.watchdog.restart_count, 2);

    // restart_count never decreases
    state.apply_event(&Event::WatchdogStateWritten {
        state: WatchdogState {
            restart_count: 1,
            last_restart_secs: 100,
            is_running: false,
        },
    });
    assert_eq!(state.watchdog.restart_count, 2);
}
