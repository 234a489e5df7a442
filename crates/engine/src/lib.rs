// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Foreman scheduling engine: queue, executors and persistence

mod computer;
mod dispatch;
mod error;
mod executor;
mod future;
mod listener;
mod queue;
mod registry;
mod runner;
mod runtime;
mod saver;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use computer::{Computer, ComputerSpec, NodeMode};
pub use dispatch::{PolicyError, QueueDecisionHandler, QueueTaskDispatcher};
pub use error::{QueueError, RuntimeError};
pub use executor::{Executable, Executor, ExecutorInfo, Interruption};
pub use future::{BuildError, BuildFuture};
pub use listener::{QueueListener, RunListener};
pub use queue::{Queue, ScheduleRequest, Scheduled, LEFT_ITEM_TTL};
pub use registry::{RegisteredTask, TaskRegistry};
pub use runner::{RunContext, RunError, TaskRunner};
pub use runtime::{Runtime, RuntimeConfig, DEFAULT_MAINTAIN_INTERVAL};
pub use saver::{
    SaveFuture, Saver, SaverDelay, SnapshotSource, SnapshotStore, DEFAULT_SAVER_DELAY,
    MIN_RETRY_DELAY,
};
