// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn fast_config(root: &Path) -> WatcherConfig {
    let mut config = WatcherConfig::new(
        root.to_owned(),
        vec![
            "requirements.txt".to_string(),
            "package.json".to_string(),
            "Cargo.toml".to_string(),
        ],
        vec!["node_modules/**".to_string(), ".git/**".to_string()],
    );
    config.scan_interval = Duration::from_millis(50);
    config.debounce = Duration::from_millis(150);
    config
}

fn watcher(root: &Path) -> FileWatcher {
    FileWatcher::new(fast_config(root)).unwrap()
}

#[test]
fn invalid_pattern_is_an_error() {
    let config = WatcherConfig::new("/ws".into(), vec!["[".to_string()], vec![]);
    assert!(matches!(
        FileWatcher::new(config),
        Err(WatchError::InvalidPattern { .. })
    ));
}

#[test]
fn tracks_by_basename_in_nested_dirs() {
    let dir = TempDir::new().unwrap();
    let w = watcher(dir.path());

    assert!(w.should_track(&dir.path().join("requirements.txt")));
    assert!(w.should_track(&dir.path().join("sub/project/package.json")));
    assert!(!w.should_track(&dir.path().join("README.md")));
}

#[test]
fn exclude_wins_over_include() {
    let dir = TempDir::new().unwrap();
    let w = watcher(dir.path());

    assert!(!w.should_track(&dir.path().join("node_modules/pkg/package.json")));
    assert!(!w.should_track(&dir.path().join(".git/hooks/package.json")));
}

#[test]
fn scan_workspace_finds_manifests_and_prunes_excluded_dirs() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("api")).unwrap();
    std::fs::create_dir_all(dir.path().join("node_modules/lib")).unwrap();
    std::fs::write(dir.path().join("requirements.txt"), "requests\n").unwrap();
    std::fs::write(dir.path().join("api/package.json"), "{}").unwrap();
    std::fs::write(dir.path().join("node_modules/lib/package.json"), "{}").unwrap();
    std::fs::write(dir.path().join("notes.txt"), "").unwrap();

    let found = watcher(dir.path()).scan_workspace();
    assert_eq!(
        found,
        vec![
            dir.path().join("api/package.json"),
            dir.path().join("requirements.txt"),
        ]
    );
}

#[tokio::test]
async fn delivers_created_event_for_new_file() {
    let dir = TempDir::new().unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watcher(dir.path()).run(tx, cancel.clone()));

    // Let the baseline scan complete before creating the file
    tokio::time::sleep(Duration::from_millis(80)).await;
    std::fs::write(dir.path().join("package.json"), "{}").unwrap();

    let (path, event) = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path, dir.path().join("package.json"));
    assert_eq!(event, FileEvent::Created);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn rapid_modifications_coalesce_into_one_delivery() {
    let dir = TempDir::new().unwrap();
    let manifest = dir.path().join("package.json");
    std::fs::write(&manifest, "{}").unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watcher(dir.path()).run(tx, cancel.clone()));
    tokio::time::sleep(Duration::from_millis(80)).await;

    // Touch the manifest several times within one debounce window
    for n in 0..5 {
        std::fs::write(&manifest, format!("{{\"touch\": {n}}}")).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (path, event) = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path, manifest);
    assert_eq!(event, FileEvent::Modified);

    // Exactly one delivery per debounce window
    let extra = tokio::time::timeout(Duration::from_millis(400), rx.recv()).await;
    assert!(extra.is_err(), "expected no second delivery, got {extra:?}");

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn deleted_file_is_reported() {
    let dir = TempDir::new().unwrap();
    let manifest = dir.path().join("requirements.txt");
    std::fs::write(&manifest, "requests\n").unwrap();

    let (tx, mut rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watcher(dir.path()).run(tx, cancel.clone()));
    tokio::time::sleep(Duration::from_millis(80)).await;

    std::fs::remove_file(&manifest).unwrap();

    let (path, event) = tokio::time::timeout(Duration::from_secs(3), rx.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(path, manifest);
    assert_eq!(event, FileEvent::Deleted);

    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test]
async fn cancellation_drops_pending_timers_without_delivery() {
    let dir = TempDir::new().unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watcher(dir.path()).run(tx, cancel.clone()));
    tokio::time::sleep(Duration::from_millis(80)).await;

    // Arm a debounce timer, then cancel before it can fire
    std::fs::write(dir.path().join("Cargo.toml"), "[dependencies]\n").unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;
    cancel.cancel();
    handle.await.unwrap();

    // Sender dropped with nothing delivered
    assert!(rx.recv().await.is_none());
}
