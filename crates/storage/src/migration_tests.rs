// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

#[test]
fn current_version_passes_through() {
    let registry = MigrationRegistry::new();
    let value = json!({"v": 2, "next_id": 7, "items": []});
    assert_eq!(registry.migrate_to(value.clone(), 2).unwrap(), value);
}

#[test]
fn v1_gains_next_id_from_items() {
    let registry = MigrationRegistry::new();
    let value = json!({"v": 1, "items": [{"id": 4}, {"id": 11}, {"id": 2}]});

    let migrated = registry.migrate_to(value, 2).unwrap();

    assert_eq!(migrated["v"], 2);
    assert_eq!(migrated["next_id"], 12);
}

#[test]
fn missing_version_is_treated_as_v1() {
    let registry = MigrationRegistry::new();
    let migrated = registry.migrate_to(json!({"items": []}), 2).unwrap();
    assert_eq!(migrated["next_id"], 1);
    assert_eq!(migrated["v"], 2);
}

#[test]
fn v1_without_items_fails() {
    let registry = MigrationRegistry::new();
    let err = registry.migrate_to(json!({"v": 1}), 2).unwrap_err();
    assert!(matches!(err, MigrationError::Failed { from: 1, to: 2, .. }));
}

#[test]
fn newer_snapshot_is_rejected() {
    let registry = MigrationRegistry::new();
    let err = registry.migrate_to(json!({"v": 9}), 2).unwrap_err();
    assert!(matches!(err, MigrationError::TooNew(9, 2)));
}

#[test]
fn gap_in_chain_reports_no_path() {
    let registry = MigrationRegistry::with_migrations(Vec::new());
    let err = registry.migrate_to(json!({"v": 1, "items": []}), 2).unwrap_err();
    assert!(matches!(err, MigrationError::NoPath(1, 2)));
}
