// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Runtime: the scheduler context.
//!
//! Owns the task registry, the queue, the computers with their executor
//! loops, the saver and the maintenance loop. Constructed once at startup
//! and passed down explicitly.

use crate::computer::{Computer, ComputerSpec};
use crate::dispatch::{QueueDecisionHandler, QueueTaskDispatcher};
use crate::error::RuntimeError;
use crate::executor::{run_loop, Executor, ExecutorInfo};
use crate::listener::{QueueListener, RunListener, RunListeners};
use crate::queue::Queue;
use crate::registry::TaskRegistry;
use crate::saver::{Saver, SaverDelay, SnapshotSource, SnapshotStore};
use fm_core::{BuildResult, CauseOfInterruption, Clock, ComputerId};
use fm_storage::QueueSnapshot;
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Default interval between periodic maintenance passes
pub const DEFAULT_MAINTAIN_INTERVAL: Duration = Duration::from_secs(5);

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Quiet period for tasks that do not set their own
    pub default_quiet_period: Duration,
    pub saver_delay: SaverDelay,
    pub maintain_interval: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_quiet_period: Duration::ZERO,
            saver_delay: SaverDelay::default(),
            maintain_interval: DEFAULT_MAINTAIN_INTERVAL,
        }
    }
}

pub struct Runtime<C: Clock> {
    queue: Arc<Queue<C>>,
    saver: Option<Saver>,
    run_listeners: Arc<RunListeners>,
    config: RuntimeConfig,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<C: Clock> Runtime<C> {
    /// Build the scheduler context. Without a store nothing is persisted.
    pub fn new(
        registry: TaskRegistry,
        clock: C,
        config: RuntimeConfig,
        store: Option<Arc<dyn SnapshotStore>>,
    ) -> Self {
        let queue = Arc::new(Queue::new(
            Arc::new(registry),
            clock,
            config.default_quiet_period,
        ));
        let saver = store.map(|store| {
            let saver = Saver::new(config.saver_delay, store);
            let weak = Arc::downgrade(&queue);
            let source: Weak<dyn SnapshotSource> = weak;
            saver.attach(source);
            queue.add_listener(Arc::new(saver.clone()));
            saver
        });
        Self {
            queue,
            saver,
            run_listeners: Arc::new(RunListeners::default()),
            config,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn queue(&self) -> &Arc<Queue<C>> {
        &self.queue
    }

    pub fn saver(&self) -> Option<&Saver> {
        self.saver.as_ref()
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn add_queue_listener(&self, listener: Arc<dyn QueueListener>) {
        self.queue.add_listener(listener);
    }

    pub fn add_run_listener(&self, listener: Arc<dyn RunListener>) {
        self.run_listeners.add(listener);
    }

    pub fn add_dispatcher(&self, dispatcher: Arc<dyn QueueTaskDispatcher>) {
        self.queue.add_dispatcher(dispatcher);
    }

    pub fn add_decision_handler(&self, handler: Arc<dyn QueueDecisionHandler>) {
        self.queue.add_decision_handler(handler);
    }

    /// Load persisted items into the queue. Call before `start`.
    pub fn restore(&self, snapshot: QueueSnapshot) -> usize {
        self.queue.restore(snapshot)
    }

    /// Start periodic maintenance and run a first pass.
    pub fn start(&self) -> Result<(), RuntimeError> {
        self.spawn_maintenance()?;
        self.queue.maintain();
        Ok(())
    }

    /// Register a computer and start one loop per executor.
    pub fn add_computer(&self, spec: ComputerSpec) -> Result<Arc<Computer>, RuntimeError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| RuntimeError::NoAsyncRuntime)?;
        let name = spec.name.clone();
        if self.queue.computer(name.as_str()).is_some() {
            return Err(RuntimeError::DuplicateComputer(name));
        }

        let computer = Arc::new(Computer::new(spec));
        {
            let mut tasks = self.tasks.lock();
            for executor in computer.executors() {
                tasks.push(handle.spawn(run_loop(
                    executor.clone(),
                    self.queue.clone(),
                    self.run_listeners.clone(),
                    self.shutdown.child_token(),
                )));
            }
        }
        if !self.queue.add_computer(computer.clone()) {
            return Err(RuntimeError::DuplicateComputer(name));
        }
        info!(computer = %name, executors = computer.executors().len(), "computer added");
        Ok(computer)
    }

    /// Take a computer offline (interrupting its builds) or back online.
    pub fn set_offline(&self, name: &str, offline: bool) -> Result<(), RuntimeError> {
        let computer = self
            .queue
            .computer(name)
            .ok_or_else(|| RuntimeError::ComputerNotFound(ComputerId::new(name)))?;
        computer.set_online(!offline);
        info!(computer = %name, offline, "computer state changed");
        if offline {
            for executor in computer.executors() {
                executor.interrupt(
                    BuildResult::Aborted,
                    Some(CauseOfInterruption::ComputerOffline),
                );
            }
        }
        self.queue.maintain();
        Ok(())
    }

    pub fn executor(&self, computer: &str, number: usize) -> Result<Arc<Executor>, RuntimeError> {
        let found = self
            .queue
            .computer(computer)
            .ok_or_else(|| RuntimeError::ComputerNotFound(ComputerId::new(computer)))?;
        found
            .executor(number)
            .cloned()
            .ok_or_else(|| RuntimeError::ExecutorNotFound {
                computer: ComputerId::new(computer),
                number,
            })
    }

    /// Views of every executor on every computer
    pub fn executors(&self) -> Vec<ExecutorInfo> {
        self.queue
            .computers()
            .iter()
            .flat_map(|c| c.executors().iter().map(|e| e.info()))
            .collect()
    }

    /// Interrupt the build on one executor
    pub fn interrupt(
        &self,
        computer: &str,
        number: usize,
        result: BuildResult,
        cause: Option<CauseOfInterruption>,
    ) -> Result<bool, RuntimeError> {
        Ok(self.executor(computer, number)?.interrupt(result, cause))
    }

    /// Run `maintain()` on an interval and when the next quiet period ends.
    pub fn spawn_maintenance(&self) -> Result<(), RuntimeError> {
        let handle =
            tokio::runtime::Handle::try_current().map_err(|_| RuntimeError::NoAsyncRuntime)?;
        let queue = self.queue.clone();
        let interval = self.config.maintain_interval;
        let shutdown = self.shutdown.child_token();
        let task = handle.spawn(async move {
            loop {
                let now_ms = queue.clock().epoch_ms();
                let until_due = queue
                    .next_due()
                    .map(|due| Duration::from_millis(due.saturating_sub(now_ms)))
                    .unwrap_or(interval);
                let wait = interval.min(until_due);
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(wait) => queue.maintain(),
                    _ = queue.changed() => {}
                }
            }
        });
        self.tasks.lock().push(task);
        Ok(())
    }

    /// Stop the scheduler.
    ///
    /// New starts are blocked, running builds get `grace` to finish and are
    /// then interrupted with `Aborted`. The queue is saved last.
    pub async fn shutdown(&self, grace: Duration) {
        info!(grace_ms = grace.as_millis() as u64, "runtime shutting down");
        self.queue.quiet_down(true);

        let deadline = tokio::time::Instant::now() + grace;
        while self.any_busy() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        for computer in self.queue.computers() {
            for executor in computer.executors() {
                executor.interrupt(BuildResult::Aborted, Some(CauseOfInterruption::Shutdown));
            }
        }
        // Interrupted runners that honor cancellation return promptly
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.any_busy() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }

        self.shutdown.cancel();
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if !task.is_finished() {
                task.abort();
            }
            let _ = task.await;
        }

        if let Some(saver) = &self.saver {
            if saver.delay() != SaverDelay::Disabled {
                if let Err(e) = saver.save_now().await {
                    warn!(error = %e, "final queue save failed");
                }
            }
        }
        info!("runtime stopped");
    }

    fn any_busy(&self) -> bool {
        self.queue
            .computers()
            .iter()
            .any(|c| c.executors().iter().any(|e| e.is_busy()))
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
