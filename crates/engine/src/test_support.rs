// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake task runner for tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::runner::{RunContext, RunError, TaskRunner};
use async_trait::async_trait;
use fm_core::{BuildResult, ItemId};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::watch;

struct FakeInner {
    result: Mutex<Result<BuildResult, String>>,
    hold: bool,
    ignore_cancel: bool,
    released: watch::Sender<bool>,
    started: watch::Sender<Vec<ItemId>>,
    finished: watch::Sender<Vec<ItemId>>,
}

/// Runner that records every build and, when holding, blocks until released
/// or interrupted.
#[derive(Clone)]
pub struct FakeRunner {
    inner: Arc<FakeInner>,
}

impl FakeRunner {
    /// Returns `Success` immediately
    pub fn new() -> Self {
        Self::build(false, false)
    }

    /// Blocks each build until [`release`](Self::release) or interruption
    pub fn holding() -> Self {
        Self::build(true, false)
    }

    /// Blocks each build until released, even when interrupted
    pub fn stubborn() -> Self {
        Self::build(true, true)
    }

    fn build(hold: bool, ignore_cancel: bool) -> Self {
        Self {
            inner: Arc::new(FakeInner {
                result: Mutex::new(Ok(BuildResult::Success)),
                hold,
                ignore_cancel,
                released: watch::channel(false).0,
                started: watch::channel(Vec::new()).0,
                finished: watch::channel(Vec::new()).0,
            }),
        }
    }

    /// Result returned by subsequent builds
    pub fn returning(self, result: BuildResult) -> Self {
        *self.inner.result.lock() = Ok(result);
        self
    }

    /// Subsequent builds fail with a runner error
    pub fn failing(self, message: &str) -> Self {
        *self.inner.result.lock() = Err(message.to_string());
        self
    }

    pub fn into_runner(self) -> Arc<dyn TaskRunner> {
        Arc::new(self)
    }

    /// Let every held build (current and future) finish
    pub fn release(&self) {
        self.inner.released.send_replace(true);
    }

    /// Items whose builds have started, in order
    pub fn started(&self) -> Vec<ItemId> {
        self.inner.started.borrow().clone()
    }

    pub fn finished(&self) -> Vec<ItemId> {
        self.inner.finished.borrow().clone()
    }

    /// Wait until at least `n` builds have started
    pub async fn wait_started(&self, n: usize) {
        let mut rx = self.inner.started.subscribe();
        let _ = rx.wait_for(|v| v.len() >= n).await;
    }

    /// Wait until at least `n` builds have returned
    pub async fn wait_finished(&self, n: usize) {
        let mut rx = self.inner.finished.subscribe();
        let _ = rx.wait_for(|v| v.len() >= n).await;
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TaskRunner for FakeRunner {
    async fn run(&self, ctx: RunContext) -> Result<BuildResult, RunError> {
        self.inner.started.send_modify(|v| v.push(ctx.item));

        let mut outcome = self.inner.result.lock().clone().map_err(RunError::Failed);
        if self.inner.hold {
            let mut released = self.inner.released.subscribe();
            if self.inner.ignore_cancel {
                let _ = released.wait_for(|r| *r).await;
            } else {
                tokio::select! {
                    _ = released.wait_for(|r| *r) => {}
                    _ = ctx.cancel.cancelled() => outcome = Err(RunError::Interrupted),
                }
            }
        }

        self.inner.finished.send_modify(|v| v.push(ctx.item));
        outcome
    }
}
