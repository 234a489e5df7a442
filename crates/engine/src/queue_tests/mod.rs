// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::computer::{ComputerSpec, NodeMode};
use crate::dispatch::PolicyError;
use crate::future::BuildError;
use crate::test_support::FakeRunner;
use fm_core::test_support::{concurrent_task, labelled_task, quiet_task, task};
use fm_core::FakeClock;

mod blocking;
mod cancel;
mod claim;
mod persistence;
mod schedule;

/// A queue with computers but no executor loops: claimed work stays on the
/// executor until a test completes it with [`Harness::complete`].
struct Harness {
    queue: Queue<FakeClock>,
    clock: FakeClock,
}

fn harness(tasks: Vec<Task>) -> Harness {
    let runner = FakeRunner::new().into_runner();
    let mut registry = TaskRegistry::new();
    for task in tasks {
        registry.register(task, runner.clone());
    }
    let clock = FakeClock::new();
    let queue = Queue::new(Arc::new(registry), clock.clone(), Duration::ZERO);
    Harness { queue, clock }
}

impl Harness {
    fn schedule(&self, task: &str) -> Scheduled {
        self.queue.schedule(ScheduleRequest::new(task)).unwrap()
    }

    fn schedule_quiet(&self, task: &str, secs: u64) -> Scheduled {
        self.queue
            .schedule(ScheduleRequest::new(task).quiet_period(Duration::from_secs(secs)))
            .unwrap()
    }

    fn add_computer(&self, spec: ComputerSpec) -> Arc<Computer> {
        let computer = Arc::new(Computer::new(spec));
        assert!(self.queue.add_computer(computer.clone()));
        computer
    }

    fn advance(&self, secs: u64) {
        self.clock.advance(Duration::from_secs(secs));
        self.queue.maintain();
    }

    fn stage(&self, id: ItemId) -> Option<Stage> {
        self.queue.item(id).map(|i| i.stage)
    }

    fn blockage(&self, id: ItemId) -> Option<CauseOfBlockage> {
        self.queue.item(id).and_then(|i| i.blockage)
    }

    /// Finish the build running on `executor` the way its loop would.
    fn complete(&self, executor: &Executor, result: BuildResult) -> ItemId {
        let (unit, _cancel) = executor.take_pending().unwrap();
        let result = executor.seal(&Ok(result), self.clock.epoch_ms());
        unit.promise.complete(result);
        self.queue.finish_build(unit.build.item, result);
        unit.build.item
    }
}

fn running_item(executor: &Executor) -> Option<ItemId> {
    executor.current_executable().map(|b| b.item)
}
