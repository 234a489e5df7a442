// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build futures handed out by the queue.
//!
//! Every queue item owns a [`BuildPromise`]; callers hold [`BuildFuture`]s
//! subscribed to it. The promise travels with the item from the queue to the
//! executor that runs it and is settled exactly once.

use fm_core::BuildResult;
use thiserror::Error;
use tokio::sync::watch;

/// Why a build future did not produce a result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("queue item was cancelled")]
    Cancelled,
    #[error("scheduler stopped before the build finished")]
    Abandoned,
}

type Slot = Option<Result<BuildResult, BuildError>>;

/// Write side of a build future.
#[derive(Debug)]
pub(crate) struct BuildPromise {
    tx: watch::Sender<Slot>,
}

impl BuildPromise {
    pub(crate) fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self { tx }
    }

    pub(crate) fn subscribe(&self) -> BuildFuture {
        BuildFuture {
            rx: self.tx.subscribe(),
        }
    }

    pub(crate) fn complete(self, result: BuildResult) {
        self.settle(Ok(result));
    }

    pub(crate) fn cancel(self) {
        self.settle(Err(BuildError::Cancelled));
    }

    fn settle(self, value: Result<BuildResult, BuildError>) {
        self.tx.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            true
        });
    }
}

/// Resolves when the build of a queue item finishes, or rejects when the item
/// is cancelled before it starts.
///
/// Clones observe the same outcome.
#[derive(Debug, Clone)]
pub struct BuildFuture {
    rx: watch::Receiver<Slot>,
}

impl BuildFuture {
    /// Wait for the outcome.
    pub async fn wait(mut self) -> Result<BuildResult, BuildError> {
        match self.rx.wait_for(Option::is_some).await {
            Ok(slot) => slot.clone().unwrap_or(Err(BuildError::Abandoned)),
            Err(_) => Err(BuildError::Abandoned),
        }
    }

    /// Outcome if already settled
    pub fn try_result(&self) -> Option<Result<BuildResult, BuildError>> {
        self.rx.borrow().clone()
    }

    pub fn is_done(&self) -> bool {
        self.rx.borrow().is_some()
    }
}

#[cfg(test)]
#[path = "future_tests.rs"]
mod tests;
