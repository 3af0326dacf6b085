// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::ReconcileError;

#[test]
fn parses_regular_and_dev_sections() {
    let text = r#"{
        "name": "app",
        "dependencies": {"lodash": "^4.17.0", "react": "18.2.0"},
        "devDependencies": {"vitest": "~1.4.0"}
    }"#;
    let declared = parse_package_json(text).unwrap();
    assert_eq!(declared.len(), 3);

    let lodash = declared.iter().find(|d| d.name == "lodash").unwrap();
    assert_eq!(lodash.spec.as_deref(), Some("^4.17.0"));
    assert!(!lodash.dev);

    let vitest = declared.iter().find(|d| d.name == "vitest").unwrap();
    assert_eq!(vitest.spec.as_deref(), Some("~1.4.0"));
    assert!(vitest.dev);
}

#[test]
fn missing_sections_declare_nothing() {
    assert!(parse_package_json(r#"{"name": "app"}"#).unwrap().is_empty());
    assert!(parse_package_json("{}").unwrap().is_empty());
}

#[test]
fn empty_spec_becomes_none() {
    let declared = parse_package_json(r#"{"dependencies": {"lodash": ""}}"#).unwrap();
    assert_eq!(declared[0].spec, None);
}

#[test]
fn malformed_json_fails_the_parse() {
    let err = parse_package_json("{not json").unwrap_err();
    assert!(matches!(err, ReconcileError::ManifestParse(_)));
}

#[test]
fn non_string_dependency_value_fails_the_parse() {
    let err = parse_package_json(r#"{"dependencies": {"lodash": {"version": "4"}}}"#).unwrap_err();
    assert!(matches!(err, ReconcileError::ManifestParse(_)));
}
