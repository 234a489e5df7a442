// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_support::FakeRunner;
use fm_core::test_support::{concurrent_task, task};

#[test]
fn lookup_by_str() {
    let registry = TaskRegistry::new().with(task("compile"), FakeRunner::new().into_runner());

    assert!(registry.contains("compile"));
    assert_eq!(registry.task("compile").unwrap().id, "compile");
    assert!(registry.get("deploy").is_none());
}

#[test]
fn register_replaces_and_keeps_order() {
    let runner = FakeRunner::new().into_runner();
    let mut registry = TaskRegistry::new()
        .with(task("a"), runner.clone())
        .with(task("b"), runner.clone());

    let old = registry.register(concurrent_task("a"), runner);

    assert!(!old.unwrap().task.concurrent);
    assert!(registry.task("a").unwrap().concurrent);
    let ids: Vec<_> = registry.tasks().map(|t| t.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
    assert_eq!(registry.len(), 2);
}
