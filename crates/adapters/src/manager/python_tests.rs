// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tempfile::TempDir;
use yare::parameterized;

fn request(name: &str, spec: Option<&str>) -> InstallRequest {
    InstallRequest {
        name: name.to_string(),
        spec: spec.map(str::to_string),
        project_path: "/ws/app".into(),
        dev: false,
    }
}

#[parameterized(
    bare_name = { None, "requests" },
    operator_spec = { Some(">=2.30"), "requests>=2.30" },
    exact_spec = { Some("==2.31.0"), "requests==2.31.0" },
    compatible_spec = { Some("~=2.30"), "requests~=2.30" },
    bare_version_pins = { Some("2.31.0"), "requests==2.31.0" },
)]
fn requirement_arg_shapes(spec: Option<&str>, expected: &str) {
    let req = request("requests", spec);
    assert_eq!(PythonPackageManager::requirement_arg(&req), expected);
}

#[tokio::test]
async fn interpreter_prefers_project_venv() {
    let dir = TempDir::new().unwrap();
    let bin = dir.path().join(".venv").join("bin");
    std::fs::create_dir_all(&bin).unwrap();
    std::fs::write(bin.join("python"), "").unwrap();

    let manager = PythonPackageManager::new(ProjectLocks::new());
    let interpreter = manager.interpreter(dir.path()).await;
    assert_eq!(
        interpreter,
        bin.join("python").display().to_string()
    );
}

#[tokio::test]
async fn interpreter_checks_venv_dirs_in_order() {
    let dir = TempDir::new().unwrap();
    for name in ["venv", "env"] {
        let bin = dir.path().join(name).join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::write(bin.join("python"), "").unwrap();
    }

    let manager = PythonPackageManager::new(ProjectLocks::new());
    let interpreter = manager.interpreter(dir.path()).await;
    assert!(interpreter.ends_with("venv/bin/python"));
    assert!(!interpreter.contains("/env/"));
}

#[tokio::test]
async fn interpreter_falls_back_to_system_python() {
    let dir = TempDir::new().unwrap();
    let manager = PythonPackageManager::new(ProjectLocks::new());
    let interpreter = manager.interpreter(dir.path()).await;
    // No venv in the project: interpreter must come from outside it
    assert!(!interpreter.starts_with(&dir.path().display().to_string()));
}

#[test]
fn pip_list_entries_parse() {
    let raw = r#"[{"name": "requests", "version": "2.31.0"}, {"name": "urllib3", "version": "2.2.1"}]"#;
    let entries: Vec<PipListEntry> = serde_json::from_str(raw).unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].name, "requests");
    assert_eq!(entries[0].version, "2.31.0");
}

#[test]
fn pip_outdated_entries_parse() {
    let raw = r#"[{"name": "requests", "version": "2.30.0", "latest_version": "2.31.0"}]"#;
    let entries: Vec<PipOutdatedEntry> = serde_json::from_str(raw).unwrap();
    assert_eq!(entries[0].latest_version, "2.31.0");
}
