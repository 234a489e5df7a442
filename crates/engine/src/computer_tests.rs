// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::test_support::{labelled_task, task};

#[test]
fn own_name_is_a_label() {
    let computer = Computer::new(ComputerSpec::new("agent-1", 2).label("linux"));

    assert!(computer.labels().contains("agent-1"));
    assert!(computer.labels().contains("linux"));
    assert_eq!(computer.executors().len(), 2);
    assert_eq!(computer.executor(1).unwrap().number(), 1);
    assert!(computer.executor(2).is_none());
    assert!(computer.is_online());
}

#[yare::parameterized(
    normal_untied       = { NodeMode::Normal, None, true },
    normal_match        = { NodeMode::Normal, Some("linux && x86"), true },
    normal_mismatch     = { NodeMode::Normal, Some("windows"), false },
    normal_by_name      = { NodeMode::Normal, Some("agent-1"), true },
    exclusive_untied    = { NodeMode::Exclusive, None, false },
    exclusive_match     = { NodeMode::Exclusive, Some("linux"), true },
    exclusive_negation  = { NodeMode::Exclusive, Some("!windows"), true },
)]
fn accepts(mode: NodeMode, label: Option<&str>, expected: bool) {
    let computer = Computer::new(
        ComputerSpec::new("agent-1", 1)
            .label("linux")
            .label("x86")
            .mode(mode),
    );
    let task = match label {
        Some(label) => labelled_task("t", label),
        None => task("t"),
    };

    assert_eq!(computer.accepts(&task), expected);
}

#[test]
fn spec_deserializes_with_defaults() {
    let spec: ComputerSpec = serde_json::from_str(r#"{"name":"n","executors":3}"#).unwrap();
    assert_eq!(spec.mode, NodeMode::Normal);
    assert!(spec.labels.is_empty());

    let spec: ComputerSpec =
        serde_json::from_str(r#"{"name":"n","executors":1,"mode":"exclusive"}"#).unwrap();
    assert_eq!(spec.mode, NodeMode::Exclusive);
}
