// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write as _;
use tempfile::TempDir;
use tend_core::{Ecosystem, TaskId, TaskStatus};

fn enqueue_event(n: u64) -> Event {
    Event::TaskEnqueued {
        id: TaskId::new(format!("t-{n}")),
        path: "/ws/requirements.txt".into(),
        ecosystem: Ecosystem::Python,
        created_at_ms: n,
    }
}

#[test]
fn append_flush_and_replay() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");

    let mut wal = Wal::open(&path, 0).unwrap();
    let seq1 = wal.append(&enqueue_event(1)).unwrap();
    let seq2 = wal.append(&enqueue_event(2)).unwrap();
    assert_eq!((seq1, seq2), (1, 2));
    wal.flush().unwrap();

    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq, 1);
    assert!(matches!(
        &entries[1].event,
        Event::TaskEnqueued { id, .. } if id == "t-2"
    ));
}

#[test]
fn reopen_continues_sequence() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&enqueue_event(1)).unwrap();
        wal.flush().unwrap();
    }

    let mut wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 1);
    let seq = wal.append(&enqueue_event(2)).unwrap();
    assert_eq!(seq, 2);
    wal.flush().unwrap();
    assert_eq!(wal.entries_after(0).unwrap().len(), 2);
}

#[test]
fn entries_after_skips_processed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");

    let mut wal = Wal::open(&path, 0).unwrap();
    for n in 1..=4 {
        wal.append(&enqueue_event(n)).unwrap();
    }
    wal.flush().unwrap();

    let entries = wal.entries_after(2).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq, 3);
}

#[test]
fn torn_tail_is_truncated_on_open() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");

    {
        let mut wal = Wal::open(&path, 0).unwrap();
        wal.append(&enqueue_event(1)).unwrap();
        wal.flush().unwrap();
    }
    // Simulate a crash mid-append: partial JSON with no trailing newline
    {
        let mut file = std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap();
        file.write_all(b"{\"seq\":2,\"event\":{\"type\":\"task").unwrap();
    }

    let mut wal = Wal::open(&path, 0).unwrap();
    assert_eq!(wal.write_seq(), 1);
    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 1);

    // The torn bytes were physically removed; new appends stay parseable
    wal.append(&enqueue_event(2)).unwrap();
    wal.flush().unwrap();
    let mut reopened = Wal::open(&path, 0).unwrap();
    assert_eq!(reopened.entries_after(0).unwrap().len(), 2);
}

#[test]
fn mid_file_corruption_is_fatal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");

    std::fs::write(
        &path,
        "{\"seq\":1,\"event\":{\"type\":\"file:removed\",\"path\":\"/a\"}}\nnot json\n{\"seq\":2,\"event\":{\"type\":\"file:removed\",\"path\":\"/b\"}}\n",
    )
    .unwrap();

    let err = match Wal::open(&path, 0) {
        Err(e) => e,
        Ok(_) => panic!("expected Wal::open to fail"),
    };
    assert!(matches!(err, WalError::Corrupt { .. }));
}

#[test]
fn truncate_before_drops_old_entries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");

    let mut wal = Wal::open(&path, 0).unwrap();
    for n in 1..=5 {
        wal.append(&enqueue_event(n)).unwrap();
    }
    wal.flush().unwrap();

    wal.truncate_before(4).unwrap();
    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].seq, 4);

    // Sequence numbering is preserved across truncation
    let seq = wal.append(&enqueue_event(6)).unwrap();
    assert_eq!(seq, 6);
}

#[test]
fn status_event_round_trips_through_wal() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("events.wal");

    let event = Event::TaskStatusChanged {
        id: TaskId::new("t-1"),
        status: TaskStatus::Failed,
        error: Some("manifest parse: bad line".to_string()),
        at_ms: 9,
    };

    let mut wal = Wal::open(&path, 0).unwrap();
    wal.append(&event).unwrap();
    wal.flush().unwrap();

    let entries = wal.entries_after(0).unwrap();
    assert_eq!(entries[0].event, event);
}
