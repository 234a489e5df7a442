// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the queue and runtime

use fm_core::{ComputerId, TaskId};
use thiserror::Error;

/// Errors returned by [`Queue::schedule`](crate::Queue::schedule)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),
    #[error("scheduling refused by {handler}: {reason}")]
    Refused { handler: String, reason: String },
}

/// Errors that can occur in the runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("computer already exists: {0}")]
    DuplicateComputer(ComputerId),
    #[error("computer not found: {0}")]
    ComputerNotFound(ComputerId),
    #[error("executor not found: {computer}#{number}")]
    ExecutorNotFound { computer: ComputerId, number: usize },
    #[error("no async runtime available")]
    NoAsyncRuntime,
}
