// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Executor slots.
//!
//! An executor is idle until the queue assigns it a work unit, busy while
//! the unit's runner runs, and idle again once the result is sealed. An
//! interruption while busy records a result and cancels the runner's token;
//! the more severe of the runner's result and the interruption result wins.

use crate::future::BuildPromise;
use crate::listener::RunListeners;
use crate::queue::Queue;
use crate::registry::RegisteredTask;
use crate::runner::{RunContext, RunError};
use fm_core::{Action, BuildResult, Cause, CauseOfInterruption, Clock, ComputerId, ItemId, TaskId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn, Instrument};

/// The build an executor is running
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Executable {
    pub item: ItemId,
    pub task: TaskId,
    pub computer: ComputerId,
    pub executor: usize,
    pub started_at_ms: u64,
    #[serde(default)]
    pub causes: Vec<Cause>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// Recorded interruption of the current build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interruption {
    pub result: BuildResult,
    #[serde(default)]
    pub causes: Vec<CauseOfInterruption>,
}

/// Point-in-time view of an executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorInfo {
    pub computer: ComputerId,
    pub number: usize,
    pub current: Option<Executable>,
    pub interruption: Option<Interruption>,
    pub idle_since_ms: Option<u64>,
}

/// Work handed from the queue to an executor
pub(crate) struct WorkUnit {
    pub(crate) build: Executable,
    pub(crate) task: RegisteredTask,
    pub(crate) promise: BuildPromise,
}

struct Running {
    build: Executable,
    cancel: CancellationToken,
    interruption: Option<Interruption>,
}

#[derive(Default)]
struct SlotState {
    running: Option<Running>,
    /// Assigned but not yet picked up by the executor loop
    pending: Option<WorkUnit>,
    idle_since_ms: Option<u64>,
}

pub struct Executor {
    computer: ComputerId,
    number: usize,
    state: Mutex<SlotState>,
    wake: Notify,
}

impl std::fmt::Debug for Executor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Executor")
            .field("computer", &self.computer)
            .field("number", &self.number)
            .field("busy", &self.is_busy())
            .finish()
    }
}

impl Executor {
    pub(crate) fn new(computer: ComputerId, number: usize) -> Self {
        Self {
            computer,
            number,
            state: Mutex::new(SlotState::default()),
            wake: Notify::new(),
        }
    }

    pub fn computer(&self) -> &ComputerId {
        &self.computer
    }

    pub fn number(&self) -> usize {
        self.number
    }

    pub fn is_busy(&self) -> bool {
        self.state.lock().running.is_some()
    }

    pub fn is_idle(&self) -> bool {
        !self.is_busy()
    }

    /// The build currently running, if any
    pub fn current_executable(&self) -> Option<Executable> {
        self.state.lock().running.as_ref().map(|r| r.build.clone())
    }

    pub fn interruption(&self) -> Option<Interruption> {
        self.state
            .lock()
            .running
            .as_ref()
            .and_then(|r| r.interruption.clone())
    }

    pub fn info(&self) -> ExecutorInfo {
        let state = self.state.lock();
        ExecutorInfo {
            computer: self.computer.clone(),
            number: self.number,
            current: state.running.as_ref().map(|r| r.build.clone()),
            interruption: state.running.as_ref().and_then(|r| r.interruption.clone()),
            idle_since_ms: state.idle_since_ms,
        }
    }

    /// Interrupt the current build.
    ///
    /// Returns `false` when idle. Repeated calls only raise the recorded
    /// result to a more severe one; causes accumulate without duplicates.
    pub fn interrupt(&self, result: BuildResult, cause: Option<CauseOfInterruption>) -> bool {
        let mut state = self.state.lock();
        let Some(running) = state.running.as_mut() else {
            return false;
        };

        let interruption = running.interruption.get_or_insert(Interruption {
            result,
            causes: Vec::new(),
        });
        interruption.result = interruption.result.worse(result);
        if let Some(cause) = cause {
            if !interruption.causes.contains(&cause) {
                interruption.causes.push(cause);
            }
        }
        let recorded = interruption.result;
        running.cancel.cancel();

        info!(
            computer = %self.computer,
            executor = self.number,
            item = %running.build.item,
            result = %recorded,
            "executor interrupted"
        );
        true
    }

    /// Hand a work unit to this executor. Fails if it is already busy.
    ///
    /// Called under the queue lock, which makes the claim atomic.
    pub(crate) fn assign(&self, unit: WorkUnit) -> Result<(), WorkUnit> {
        let mut state = self.state.lock();
        if state.running.is_some() || state.pending.is_some() {
            return Err(unit);
        }
        state.running = Some(Running {
            build: unit.build.clone(),
            cancel: CancellationToken::new(),
            interruption: None,
        });
        state.pending = Some(unit);
        state.idle_since_ms = None;
        drop(state);
        self.wake.notify_one();
        Ok(())
    }

    pub(crate) fn take_pending(&self) -> Option<(WorkUnit, CancellationToken)> {
        let mut state = self.state.lock();
        let unit = state.pending.take()?;
        let cancel = state.running.as_ref()?.cancel.clone();
        Some((unit, cancel))
    }

    /// Settle the final result of the current build and go idle.
    pub(crate) fn seal(
        &self,
        outcome: &Result<BuildResult, RunError>,
        now_ms: u64,
    ) -> BuildResult {
        let mut state = self.state.lock();
        let interruption = state.running.take().and_then(|r| r.interruption);
        state.idle_since_ms = Some(now_ms);
        final_result(outcome, interruption.map(|i| i.result))
    }
}

/// Combine a runner outcome with a recorded interruption result.
pub(crate) fn final_result(
    outcome: &Result<BuildResult, RunError>,
    interrupted: Option<BuildResult>,
) -> BuildResult {
    match (outcome, interrupted) {
        (Ok(result), Some(interrupt)) => result.worse(interrupt),
        (Err(_), Some(interrupt)) => interrupt,
        (Ok(result), None) => *result,
        (Err(_), None) => BuildResult::Failure,
    }
}

/// Executor loop: wait for assigned work, run it, report back to the queue.
pub(crate) async fn run_loop<C: Clock>(
    executor: Arc<Executor>,
    queue: Arc<Queue<C>>,
    listeners: Arc<RunListeners>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = executor.wake.notified() => {}
        }
        while let Some((unit, cancel)) = executor.take_pending() {
            run_unit(&executor, &queue, &listeners, unit, cancel).await;
        }
    }
}

async fn run_unit<C: Clock>(
    executor: &Executor,
    queue: &Queue<C>,
    listeners: &RunListeners,
    unit: WorkUnit,
    cancel: CancellationToken,
) {
    let WorkUnit {
        build,
        task,
        promise,
    } = unit;
    let span = tracing::info_span!(
        "build",
        task = %build.task,
        item = %build.item,
        computer = %build.computer,
        executor = build.executor,
    );

    async {
        info!("build started");
        listeners.started(&build);

        let ctx = RunContext {
            item: build.item,
            task: task.task.clone(),
            causes: build.causes.clone(),
            actions: build.actions.clone(),
            computer: build.computer.clone(),
            executor: build.executor,
            cancel,
        };
        let runner = task.runner.clone();
        let outcome = match tokio::spawn(async move { runner.run(ctx).await }).await {
            Ok(outcome) => outcome,
            Err(e) => Err(RunError::Panicked(e.to_string())),
        };
        if let Err(e) = &outcome {
            warn!(error = %e, "runner returned an error");
        }

        let result = executor.seal(&outcome, queue.clock().epoch_ms());
        let elapsed_ms = queue
            .clock()
            .epoch_ms()
            .saturating_sub(build.started_at_ms);
        info!(result = %result, elapsed_ms, "build completed");

        listeners.completed(&build, result);
        promise.complete(result);
        queue.finish_build(build.item, result);
    }
    .instrument(span)
    .await
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
