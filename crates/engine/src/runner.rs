// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The seam between an executor and the work it runs.

use async_trait::async_trait;
use fm_core::{parameters_of, Action, BuildResult, Cause, ComputerId, ItemId, Task};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors a runner may return instead of a result
#[derive(Debug, Error)]
pub enum RunError {
    #[error("interrupted")]
    Interrupted,
    #[error("{0}")]
    Failed(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("runner panicked: {0}")]
    Panicked(String),
}

/// Everything a runner gets for one build.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub item: ItemId,
    pub task: Arc<Task>,
    pub causes: Vec<Cause>,
    pub actions: Vec<Action>,
    pub computer: ComputerId,
    pub executor: usize,
    /// Cancelled when the executor is interrupted. Runners poll or select on it.
    pub cancel: CancellationToken,
}

impl RunContext {
    /// Build parameters contributed by the item's actions
    pub fn parameters(&self) -> BTreeMap<String, String> {
        parameters_of(&self.actions)
    }
}

/// Runs the work of a task.
///
/// A runner that ignores `ctx.cancel` still has its outcome overridden by the
/// interruption result once it returns.
#[async_trait]
pub trait TaskRunner: Send + Sync + 'static {
    async fn run(&self, ctx: RunContext) -> Result<BuildResult, RunError>;
}
