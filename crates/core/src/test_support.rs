// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{Action, Cause, ItemId, Label, QueueItem, Stage, Task};
use std::time::Duration;

// ── Task factory functions ──────────────────────────────────────────────────

/// Non-concurrent task that runs anywhere
pub fn task(name: &str) -> Task {
    Task::new(name)
}

/// Task that allows overlapping builds
pub fn concurrent_task(name: &str) -> Task {
    Task::new(name).with_concurrent(true)
}

/// Task tied to a label expression
pub fn labelled_task(name: &str, label: &str) -> Task {
    match Label::parse(label) {
        Ok(label) => Task::new(name).with_label(label),
        Err(e) => panic!("bad test label {label:?}: {e}"),
    }
}

/// Task with its own default quiet period
pub fn quiet_task(name: &str, quiet: Duration) -> Task {
    Task::new(name).with_quiet_period(quiet)
}

// ── Item factory functions ──────────────────────────────────────────────────

pub fn queue_item(id: u64, task: &str, stage: Stage) -> QueueItem {
    QueueItem {
        id: ItemId::new(id),
        task: task.into(),
        stage,
        submitted_at_ms: 1_000_000,
        due_at_ms: 1_000_000,
        buildable_since_ms: match stage {
            Stage::Waiting => None,
            Stage::Blocked | Stage::Buildable => Some(1_000_000),
        },
        causes: vec![Cause::User {
            name: "tester".to_string(),
        }],
        actions: vec![Action::note("origin", "test")],
        blockage: None,
    }
}
