// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The build queue.
//!
//! Items move Waiting → Blocked → Buildable and then leave the queue, either
//! claimed by an executor or cancelled. All state lives behind one lock;
//! every stage transition, claim and cancellation happens under it, and every
//! mutating call runs a maintenance pass before returning. Listeners are
//! notified after the lock is released.

use crate::computer::Computer;
use crate::dispatch::{QueueDecisionHandler, QueueTaskDispatcher};
use crate::error::QueueError;
use crate::executor::{Executable, Executor, WorkUnit};
use crate::future::{BuildFuture, BuildPromise};
use crate::listener::QueueListener;
use crate::registry::{RegisteredTask, TaskRegistry};
use crate::saver::SnapshotSource;
use fm_core::{
    parameters_of, Action, BuildResult, Cause, CauseOfBlockage, CauseOfInterruption, Clock,
    ComputerId, ItemId, Label, LeftItem, LeftOutcome, QueueItem, Stage, Task, TaskId,
};
use fm_storage::{ItemRecord, QueueSnapshot};
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// How long a left item stays queryable
pub const LEFT_ITEM_TTL: Duration = Duration::from_secs(5 * 60);

/// Upper bound on remembered left items
const MAX_LEFT_ITEMS: usize = 1024;

/// A submission to the queue
#[derive(Debug, Clone)]
pub struct ScheduleRequest {
    pub task: TaskId,
    /// `None` falls back to the task's quiet period, then the queue default
    pub quiet_period: Option<Duration>,
    pub causes: Vec<Cause>,
    pub actions: Vec<Action>,
}

impl ScheduleRequest {
    pub fn new(task: impl Into<TaskId>) -> Self {
        Self {
            task: task.into(),
            quiet_period: None,
            causes: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = Some(quiet_period);
        self
    }

    pub fn cause(mut self, cause: Cause) -> Self {
        self.causes.push(cause);
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }
}

/// Outcome of a successful [`Queue::schedule`]
#[derive(Debug, Clone)]
pub struct Scheduled {
    pub item: ItemId,
    /// `false` when the submission was merged into an existing item
    pub created: bool,
    pub future: BuildFuture,
}

struct Entry {
    item: QueueItem,
    promise: BuildPromise,
}

struct Building {
    task: TaskId,
    future: BuildFuture,
}

enum Notice {
    Waiting(QueueItem),
    Blocked(QueueItem),
    Buildable(QueueItem),
    Left(LeftItem),
}

#[derive(Default)]
struct QueueState {
    next_id: u64,
    /// Queued items in submission (id) order
    items: IndexMap<ItemId, Entry>,
    /// Items claimed by an executor whose build has not finished
    building: HashMap<ItemId, Building>,
    left: VecDeque<LeftItem>,
    computers: IndexMap<ComputerId, Arc<Computer>>,
    quieting_down: bool,
}

impl QueueState {
    fn is_building(&self, task: &TaskId) -> bool {
        self.building.values().any(|b| &b.task == task)
    }

    fn remember_left(&mut self, left: LeftItem, now_ms: u64) {
        let ttl_ms = LEFT_ITEM_TTL.as_millis() as u64;
        while let Some(front) = self.left.front() {
            if now_ms.saturating_sub(front.left_at_ms) < ttl_ms
                && self.left.len() < MAX_LEFT_ITEMS
            {
                break;
            }
            self.left.pop_front();
        }
        self.left.push_back(left);
    }

    fn executor_running(&self, item: ItemId) -> Option<&Arc<Executor>> {
        self.computers
            .values()
            .flat_map(|c| c.executors())
            .find(|e| e.current_executable().is_some_and(|b| b.item == item))
    }
}

pub struct Queue<C: Clock> {
    registry: Arc<TaskRegistry>,
    clock: C,
    default_quiet_period: Duration,
    state: Mutex<QueueState>,
    listeners: RwLock<Vec<Arc<dyn QueueListener>>>,
    dispatchers: RwLock<Vec<Arc<dyn QueueTaskDispatcher>>>,
    decision_handlers: RwLock<Vec<Arc<dyn QueueDecisionHandler>>>,
    changed: tokio::sync::Notify,
}

impl<C: Clock> Queue<C> {
    pub fn new(registry: Arc<TaskRegistry>, clock: C, default_quiet_period: Duration) -> Self {
        Self {
            registry,
            clock,
            default_quiet_period,
            state: Mutex::new(QueueState {
                next_id: 1,
                ..QueueState::default()
            }),
            listeners: RwLock::new(Vec::new()),
            dispatchers: RwLock::new(Vec::new()),
            decision_handlers: RwLock::new(Vec::new()),
            changed: tokio::sync::Notify::new(),
        }
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn add_listener(&self, listener: Arc<dyn QueueListener>) {
        self.listeners.write().push(listener);
    }

    pub fn add_dispatcher(&self, dispatcher: Arc<dyn QueueTaskDispatcher>) {
        self.dispatchers.write().push(dispatcher);
    }

    pub fn add_decision_handler(&self, handler: Arc<dyn QueueDecisionHandler>) {
        self.decision_handlers.write().push(handler);
    }

    // ── Mutations ───────────────────────────────────────────────────────

    /// Put a task in the queue, or fold the submission into an equivalent
    /// queued item.
    ///
    /// An item is equivalent when it belongs to the same non-concurrent task
    /// and carries the same parameters. Its causes and notes absorb the new
    /// ones and, while it is still waiting, its due time becomes the earlier
    /// of the two.
    pub fn schedule(&self, request: ScheduleRequest) -> Result<Scheduled, QueueError> {
        let task = self
            .registry
            .task(request.task.as_str())
            .ok_or_else(|| QueueError::UnknownTask(request.task.clone()))?
            .clone();

        for handler in self.decision_handlers.read().iter() {
            if let Err(reason) = handler.should_schedule(&task, &request.causes, &request.actions)
            {
                info!(task = %task.id, handler = handler.name(), %reason, "schedule refused");
                return Err(QueueError::Refused {
                    handler: handler.name().to_string(),
                    reason,
                });
            }
        }

        let quiet = request
            .quiet_period
            .or(task.quiet_period)
            .unwrap_or(self.default_quiet_period);
        let now_ms = self.clock.epoch_ms();
        // Absurd quiet periods clamp to "never due" rather than wrapping
        let quiet_ms = u64::try_from(quiet.as_millis()).unwrap_or(u64::MAX);
        let due_at_ms = now_ms.saturating_add(quiet_ms);

        let mut notices = Vec::new();
        let scheduled = {
            let mut state = self.state.lock();
            let existing = find_equivalent(&state, &task, &request.actions);
            let scheduled = match existing.and_then(|id| state.items.get_mut(&id)) {
                Some(entry) => {
                    fold_into(&mut entry.item, request, due_at_ms);
                    debug!(item = %entry.item.id, task = %task.id, "merged into queued item");
                    Scheduled {
                        item: entry.item.id,
                        created: false,
                        future: entry.promise.subscribe(),
                    }
                }
                None => {
                    let id = ItemId::new(state.next_id);
                    state.next_id += 1;
                    let item = QueueItem {
                        id,
                        task: task.id.clone(),
                        stage: Stage::Waiting,
                        submitted_at_ms: now_ms,
                        due_at_ms,
                        buildable_since_ms: None,
                        causes: request.causes,
                        actions: request.actions,
                        blockage: None,
                    };
                    let promise = BuildPromise::new();
                    let future = promise.subscribe();
                    info!(item = %id, task = %task.id, quiet_ms, "scheduled");
                    notices.push(Notice::Waiting(item.clone()));
                    state.items.insert(id, Entry { item, promise });
                    Scheduled {
                        item: id,
                        created: true,
                        future,
                    }
                }
            };
            self.maintain_locked(&mut state, &mut notices);
            scheduled
        };
        self.notify(notices);
        Ok(scheduled)
    }

    /// Cancel an item.
    ///
    /// A queued item is removed and its future rejected (`true`). An item
    /// already running has its executor interrupted with `Aborted` instead
    /// (`false`). Unknown or already finished items are a no-op (`false`).
    pub fn cancel(&self, id: ItemId) -> bool {
        let mut notices = Vec::new();
        let cancelled = {
            let mut state = self.state.lock();
            let cancelled = self.cancel_locked(&mut state, id, &mut notices);
            if !cancelled {
                if let Some(executor) = state.executor_running(id) {
                    executor.interrupt(BuildResult::Aborted, Some(CauseOfInterruption::Cancelled));
                }
            }
            self.maintain_locked(&mut state, &mut notices);
            cancelled
        };
        self.notify(notices);
        cancelled
    }

    /// Cancel every queued item of a task. Returns how many were removed.
    pub fn cancel_task(&self, task: &str) -> usize {
        self.cancel_where(|item| item.task == task)
    }

    /// Cancel every queued item. Running builds are not touched.
    pub fn clear(&self) -> usize {
        self.cancel_where(|_| true)
    }

    fn cancel_where(&self, pred: impl Fn(&QueueItem) -> bool) -> usize {
        let mut notices = Vec::new();
        let count = {
            let mut state = self.state.lock();
            let ids: Vec<ItemId> = state
                .items
                .values()
                .filter(|e| pred(&e.item))
                .map(|e| e.item.id)
                .collect();
            for id in &ids {
                self.cancel_locked(&mut state, *id, &mut notices);
            }
            self.maintain_locked(&mut state, &mut notices);
            ids.len()
        };
        self.notify(notices);
        count
    }

    fn cancel_locked(&self, state: &mut QueueState, id: ItemId, notices: &mut Vec<Notice>) -> bool {
        let Some(entry) = state.items.shift_remove(&id) else {
            return false;
        };
        let left = LeftItem {
            id,
            task: entry.item.task.clone(),
            causes: entry.item.causes,
            left_at_ms: self.clock.epoch_ms(),
            outcome: LeftOutcome::Cancelled,
            result: None,
        };
        info!(item = %id, task = %left.task, "cancelled");
        entry.promise.cancel();
        state.remember_left(left.clone(), self.clock.epoch_ms());
        notices.push(Notice::Left(left));
        true
    }

    /// Block (or unblock) every new build start.
    pub fn quiet_down(&self, on: bool) {
        {
            let mut state = self.state.lock();
            if state.quieting_down != on {
                info!(quieting_down = on, "quiet down changed");
            }
            state.quieting_down = on;
        }
        self.maintain();
    }

    pub fn is_quieting_down(&self) -> bool {
        self.state.lock().quieting_down
    }

    pub(crate) fn add_computer(&self, computer: Arc<Computer>) -> bool {
        {
            let mut state = self.state.lock();
            if state.computers.contains_key(computer.name()) {
                return false;
            }
            state.computers.insert(computer.name().clone(), computer);
        }
        self.maintain();
        true
    }

    /// A build claimed from this queue finished; its task no longer blocks.
    /// The result stays queryable with the left item.
    pub(crate) fn finish_build(&self, id: ItemId, result: BuildResult) {
        let mut notices = Vec::new();
        {
            let mut state = self.state.lock();
            state.building.remove(&id);
            if let Some(left) = state.left.iter_mut().rev().find(|l| l.id == id) {
                left.result = Some(result);
            }
            self.maintain_locked(&mut state, &mut notices);
        }
        self.notify(notices);
    }

    /// Load persisted items. Records whose task is no longer registered are
    /// dropped. Returns the number of restored items.
    pub fn restore(&self, snapshot: QueueSnapshot) -> usize {
        let now_ms = self.clock.epoch_ms();
        let mut restored = 0;
        {
            let mut state = self.state.lock();
            for record in snapshot.items {
                if !self.registry.contains(record.task.as_str()) {
                    debug!(item = %record.id, task = %record.task, "dropping item of unknown task");
                    continue;
                }
                if state.items.contains_key(&record.id) {
                    continue;
                }
                state.next_id = state.next_id.max(record.id.get() + 1);
                let item = QueueItem {
                    id: record.id,
                    task: record.task,
                    stage: record.stage,
                    submitted_at_ms: record.submitted_at_ms,
                    due_at_ms: record.due_at_ms,
                    buildable_since_ms: match record.stage {
                        Stage::Waiting => None,
                        Stage::Blocked | Stage::Buildable => Some(now_ms),
                    },
                    causes: record.causes,
                    actions: record.actions,
                    blockage: None,
                };
                state.items.insert(
                    item.id,
                    Entry {
                        item,
                        promise: BuildPromise::new(),
                    },
                );
                restored += 1;
            }
            state.next_id = state.next_id.max(snapshot.next_id);
            state.items.sort_keys();
        }
        info!(restored, "queue restored");
        self.maintain();
        restored
    }

    // ── Maintenance ─────────────────────────────────────────────────────

    /// Re-evaluate every stage transition once and hand buildable items to
    /// idle executors.
    pub fn maintain(&self) {
        let mut notices = Vec::new();
        {
            let mut state = self.state.lock();
            self.maintain_locked(&mut state, &mut notices);
        }
        self.notify(notices);
    }

    fn maintain_locked(&self, state: &mut QueueState, notices: &mut Vec<Notice>) {
        let now_ms = self.clock.epoch_ms();
        let dispatchers = self.dispatchers.read();

        // Blocked items whose blockage cleared
        let blocked: Vec<ItemId> = ids_in(state, Stage::Blocked);
        for id in blocked {
            let Some(task) = self.task_of(state, id) else {
                continue;
            };
            let blockage = self.blockage(state, &dispatchers, id, &task.task);
            let Some(entry) = state.items.get_mut(&id) else {
                continue;
            };
            match blockage {
                Some(cause) => entry.item.blockage = Some(cause),
                None => {
                    entry.item.stage = Stage::Buildable;
                    entry.item.blockage = None;
                    notices.push(Notice::Buildable(entry.item.clone()));
                }
            }
        }

        // Waiting items whose quiet period is over
        let waiting: Vec<ItemId> = ids_in(state, Stage::Waiting);
        for id in waiting {
            let Some(task) = self.task_of(state, id) else {
                continue;
            };
            let due_at_ms = state.items.get(&id).map(|e| e.item.due_at_ms).unwrap_or(0);
            if due_at_ms > now_ms {
                if let Some(entry) = state.items.get_mut(&id) {
                    entry.item.blockage = Some(CauseOfBlockage::InQuietPeriod {
                        remaining_ms: due_at_ms - now_ms,
                    });
                }
                continue;
            }
            let blockage = self.blockage(state, &dispatchers, id, &task.task);
            let Some(entry) = state.items.get_mut(&id) else {
                continue;
            };
            entry.item.buildable_since_ms = Some(now_ms);
            match blockage {
                Some(cause) => {
                    entry.item.stage = Stage::Blocked;
                    entry.item.blockage = Some(cause);
                    notices.push(Notice::Blocked(entry.item.clone()));
                }
                None => {
                    entry.item.stage = Stage::Buildable;
                    entry.item.blockage = None;
                    notices.push(Notice::Buildable(entry.item.clone()));
                }
            }
        }

        // Buildable items, oldest first
        let mut buildable: Vec<(u64, ItemId)> = state
            .items
            .values()
            .filter(|e| e.item.stage == Stage::Buildable)
            .map(|e| (e.item.buildable_since_ms.unwrap_or(0), e.item.id))
            .collect();
        buildable.sort();
        for (_, id) in buildable {
            let Some(task) = self.task_of(state, id) else {
                continue;
            };
            // Last-minute check: an earlier claim in this pass may block it now
            if let Some(cause) = self.blockage(state, &dispatchers, id, &task.task) {
                if let Some(entry) = state.items.get_mut(&id) {
                    entry.item.stage = Stage::Blocked;
                    entry.item.blockage = Some(cause);
                    notices.push(Notice::Blocked(entry.item.clone()));
                }
                continue;
            }
            if let Some(left) = self.try_claim(state, &dispatchers, id, &task, now_ms) {
                notices.push(Notice::Left(left));
            }
        }
    }

    /// Offer a buildable item to idle executors. On success the item leaves
    /// the queue and the work unit is on its way to the executor.
    fn try_claim(
        &self,
        state: &mut QueueState,
        dispatchers: &[Arc<dyn QueueTaskDispatcher>],
        id: ItemId,
        task: &RegisteredTask,
        now_ms: u64,
    ) -> Option<LeftItem> {
        let entry = state.items.get(&id)?;
        let mut any_match = false;
        let mut target = None;
        'computers: for computer in state.computers.values() {
            if !computer.is_online() || !computer.accepts(&task.task) {
                continue;
            }
            any_match = true;
            if dispatchers
                .iter()
                .any(|d| d.can_take(computer, &entry.item).is_some())
            {
                continue;
            }
            for executor in computer.executors() {
                if executor.is_idle() {
                    target = Some(executor.clone());
                    break 'computers;
                }
            }
        }

        let Some(executor) = target else {
            let blockage = match (&task.task.label, any_match) {
                (Some(label), false) => CauseOfBlockage::NoMatchingComputer {
                    label: label.to_string(),
                },
                (label, _) => CauseOfBlockage::WaitingForExecutor {
                    label: label.as_ref().map(|l| l.to_string()),
                },
            };
            if let Some(entry) = state.items.get_mut(&id) {
                entry.item.blockage = Some(blockage);
            }
            return None;
        };

        let entry = state.items.shift_remove(&id)?;
        let build = Executable {
            item: id,
            task: entry.item.task.clone(),
            computer: executor.computer().clone(),
            executor: executor.number(),
            started_at_ms: now_ms,
            causes: entry.item.causes.clone(),
            actions: entry.item.actions.clone(),
        };
        let future = entry.promise.subscribe();
        let unit = WorkUnit {
            build,
            task: task.clone(),
            promise: entry.promise,
        };
        if let Err(unit) = executor.assign(unit) {
            // Lost a race with a direct assignment; put the item back
            warn!(item = %id, "executor became busy during claim");
            state.items.insert(
                id,
                Entry {
                    item: entry.item,
                    promise: unit.promise,
                },
            );
            state.items.sort_keys();
            return None;
        }

        state.building.insert(
            id,
            Building {
                task: entry.item.task.clone(),
                future,
            },
        );
        let left = LeftItem {
            id,
            task: entry.item.task,
            causes: entry.item.causes,
            left_at_ms: now_ms,
            outcome: LeftOutcome::Started {
                computer: executor.computer().clone(),
                executor: executor.number(),
            },
            result: None,
        };
        info!(item = %id, task = %left.task, computer = %executor.computer(), executor = executor.number(), "claimed");
        state.remember_left(left.clone(), now_ms);
        Some(left)
    }

    /// First blocking predicate that holds for an item, if any.
    fn blockage(
        &self,
        state: &QueueState,
        dispatchers: &[Arc<dyn QueueTaskDispatcher>],
        id: ItemId,
        task: &Task,
    ) -> Option<CauseOfBlockage> {
        if state.quieting_down {
            return Some(CauseOfBlockage::QuietingDown);
        }
        if !task.concurrent && state.is_building(&task.id) {
            return Some(CauseOfBlockage::BuildInProgress {
                task: task.id.clone(),
            });
        }
        if let Some(upstream) = task.block_on.iter().find(|t| state.is_building(t)) {
            return Some(CauseOfBlockage::BlockedByTask {
                task: upstream.clone(),
            });
        }
        let item = &state.items.get(&id)?.item;
        for dispatcher in dispatchers {
            match dispatcher.can_run(item, task) {
                Ok(None) => {}
                Ok(Some(reason)) => {
                    return Some(CauseOfBlockage::Policy {
                        source: dispatcher.name().to_string(),
                        reason,
                    })
                }
                Err(e) => {
                    warn!(item = %id, dispatcher = dispatcher.name(), error = %e, "blockage check failed");
                    return Some(CauseOfBlockage::PolicyError {
                        source: dispatcher.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }
        None
    }

    fn task_of(&self, state: &QueueState, id: ItemId) -> Option<RegisteredTask> {
        let entry = state.items.get(&id)?;
        self.registry.get(entry.item.task.as_str()).cloned()
    }

    fn notify(&self, notices: Vec<Notice>) {
        if notices.is_empty() {
            return;
        }
        let listeners = self.listeners.read();
        for notice in &notices {
            match notice {
                Notice::Waiting(item) => {
                    debug!(item = %item.id, "entered waiting");
                    listeners.iter().for_each(|l| l.on_enter_waiting(item));
                }
                Notice::Blocked(item) => {
                    debug!(item = %item.id, why = ?item.why(), "entered blocked");
                    listeners.iter().for_each(|l| l.on_enter_blocked(item));
                }
                Notice::Buildable(item) => {
                    debug!(item = %item.id, "entered buildable");
                    listeners.iter().for_each(|l| l.on_enter_buildable(item));
                }
                Notice::Left(item) => {
                    debug!(item = %item.id, cancelled = item.is_cancelled(), "left queue");
                    listeners.iter().for_each(|l| l.on_left(item));
                }
            }
        }
        drop(listeners);
        self.changed.notify_waiters();
    }

    /// Resolves the next time any item changes stage or leaves.
    pub async fn changed(&self) {
        self.changed.notified().await;
    }

    // ── Reads ───────────────────────────────────────────────────────────

    /// Copies of every queued item in id order
    pub fn items(&self) -> Vec<QueueItem> {
        self.state
            .lock()
            .items
            .values()
            .map(|e| e.item.clone())
            .collect()
    }

    pub fn item(&self, id: ItemId) -> Option<QueueItem> {
        self.state.lock().items.get(&id).map(|e| e.item.clone())
    }

    /// Buildable items, oldest first
    pub fn buildable_items(&self) -> Vec<QueueItem> {
        let mut items: Vec<QueueItem> = self
            .state
            .lock()
            .items
            .values()
            .filter(|e| e.item.stage == Stage::Buildable)
            .map(|e| e.item.clone())
            .collect();
        items.sort_by_key(|i| (i.buildable_since_ms, i.id));
        items
    }

    /// What became of an item that recently left the queue
    pub fn left_item(&self, id: ItemId) -> Option<LeftItem> {
        self.state
            .lock()
            .left
            .iter()
            .rev()
            .find(|l| l.id == id)
            .cloned()
    }

    /// Buildable items whose task carries exactly `label`
    pub fn count_buildable_for(&self, label: Option<&Label>) -> usize {
        let state = self.state.lock();
        state
            .items
            .values()
            .filter(|e| e.item.stage == Stage::Buildable)
            .filter(|e| {
                self.registry
                    .task(e.item.task.as_str())
                    .is_some_and(|t| t.label.as_ref() == label)
            })
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state.lock().items.len()
    }

    /// Whether any queued item belongs to `task`
    pub fn contains(&self, task: &str) -> bool {
        self.state.lock().items.values().any(|e| e.item.task == task)
    }

    /// Whether a build of `task` is running
    pub fn is_building(&self, task: &str) -> bool {
        self.state
            .lock()
            .building
            .values()
            .any(|b| b.task == task)
    }

    /// Earliest due time among waiting items
    pub fn next_due(&self) -> Option<u64> {
        self.state
            .lock()
            .items
            .values()
            .filter(|e| e.item.stage == Stage::Waiting)
            .map(|e| e.item.due_at_ms)
            .min()
    }

    /// Future of a queued or running item
    pub fn future(&self, id: ItemId) -> Option<BuildFuture> {
        let state = self.state.lock();
        if let Some(entry) = state.items.get(&id) {
            return Some(entry.promise.subscribe());
        }
        state.building.get(&id).map(|b| b.future.clone())
    }

    pub fn computers(&self) -> Vec<Arc<Computer>> {
        self.state.lock().computers.values().cloned().collect()
    }

    pub fn computer(&self, name: &str) -> Option<Arc<Computer>> {
        self.state.lock().computers.get(name).cloned()
    }
}

impl<C: Clock> SnapshotSource for Queue<C> {
    fn snapshot(&self) -> QueueSnapshot {
        let state = self.state.lock();
        let items = state
            .items
            .values()
            .map(|e| ItemRecord {
                id: e.item.id,
                task: e.item.task.clone(),
                submitted_at_ms: e.item.submitted_at_ms,
                due_at_ms: e.item.due_at_ms,
                stage: e.item.stage,
                causes: e.item.causes.clone(),
                actions: e.item.actions.clone(),
            })
            .collect();
        QueueSnapshot::new(state.next_id, items)
    }
}

fn ids_in(state: &QueueState, stage: Stage) -> Vec<ItemId> {
    state
        .items
        .values()
        .filter(|e| e.item.stage == stage)
        .map(|e| e.item.id)
        .collect()
}

/// Queued item the submission should merge into
fn find_equivalent(state: &QueueState, task: &Task, actions: &[Action]) -> Option<ItemId> {
    if task.concurrent {
        return None;
    }
    let params = parameters_of(actions);
    state
        .items
        .values()
        .find(|e| e.item.task == task.id && parameters_of(&e.item.actions) == params)
        .map(|e| e.item.id)
}

fn fold_into(item: &mut QueueItem, request: ScheduleRequest, due_at_ms: u64) {
    item.causes.extend(request.causes);
    item.actions.extend(
        request
            .actions
            .into_iter()
            .filter(|a| matches!(a, Action::Note { .. })),
    );
    if item.stage == Stage::Waiting {
        item.due_at_ms = item.due_at_ms.min(due_at_ms);
    }
}

#[cfg(test)]
#[path = "queue_tests/mod.rs"]
mod tests;
