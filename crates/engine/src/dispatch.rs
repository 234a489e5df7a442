// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pluggable scheduling policies.
//!
//! Policies run under the queue lock and must not call back into the queue.

use crate::computer::Computer;
use fm_core::{Action, Cause, QueueItem, Task};
use thiserror::Error;

/// A policy failed to reach a verdict
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct PolicyError(pub String);

/// Vetoes builds or node assignments.
pub trait QueueTaskDispatcher: Send + Sync {
    fn name(&self) -> &str;

    /// `Ok(Some(reason))` keeps the item blocked. An error is treated as a
    /// transient block and retried on the next maintenance pass.
    fn can_run(&self, _item: &QueueItem, _task: &Task) -> Result<Option<String>, PolicyError> {
        Ok(None)
    }

    /// `Some(reason)` keeps the item off this computer.
    fn can_take(&self, _computer: &Computer, _item: &QueueItem) -> Option<String> {
        None
    }
}

/// Decides whether a submission enters the queue at all.
pub trait QueueDecisionHandler: Send + Sync {
    fn name(&self) -> &str;

    /// `Err(reason)` refuses the submission.
    fn should_schedule(&self, task: &Task, causes: &[Cause], actions: &[Action])
        -> Result<(), String>;
}
