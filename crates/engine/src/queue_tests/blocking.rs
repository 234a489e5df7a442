// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use parking_lot::Mutex as PlMutex;

fn with_branch(task: &str, branch: &str) -> ScheduleRequest {
    ScheduleRequest::new(task).action(Action::parameters([("BRANCH", branch)]))
}

#[test]
fn non_concurrent_task_blocks_while_building() {
    let h = harness(vec![task("compile")]);
    let node = h.add_computer(ComputerSpec::new("built-in", 2));

    let first = h.queue.schedule(with_branch("compile", "main")).unwrap().item;
    let second = h.queue.schedule(with_branch("compile", "dev")).unwrap().item;

    assert_eq!(running_item(&node.executors()[0]), Some(first));
    assert_eq!(h.stage(second), Some(Stage::Blocked));
    assert_eq!(
        h.blockage(second),
        Some(CauseOfBlockage::BuildInProgress {
            task: "compile".into()
        })
    );
    assert!(node.executors()[1].is_idle());

    h.complete(&node.executors()[0], BuildResult::Success);

    assert!(h.queue.item(second).is_none());
    assert_eq!(running_item(&node.executors()[0]), Some(second));
}

#[test]
fn concurrent_task_runs_in_parallel() {
    let h = harness(vec![concurrent_task("test")]);
    let node = h.add_computer(ComputerSpec::new("built-in", 2));

    let a = h.schedule("test").item;
    let b = h.schedule("test").item;

    assert_eq!(running_item(&node.executors()[0]), Some(a));
    assert_eq!(running_item(&node.executors()[1]), Some(b));
    assert!(h.queue.is_empty());
}

#[test]
fn block_on_waits_for_upstream() {
    let h = harness(vec![task("compile"), task("deploy").blocked_by("compile")]);
    let node = h.add_computer(ComputerSpec::new("built-in", 2));

    h.schedule("compile");
    let deploy = h.schedule("deploy").item;

    assert_eq!(
        h.blockage(deploy),
        Some(CauseOfBlockage::BlockedByTask {
            task: "compile".into()
        })
    );

    h.complete(&node.executors()[0], BuildResult::Success);

    assert_eq!(running_item(&node.executors()[0]), Some(deploy));
}

#[test]
fn quiet_down_blocks_new_starts() {
    let h = harness(vec![task("compile")]);
    let node = h.add_computer(ComputerSpec::new("built-in", 1));
    h.queue.quiet_down(true);
    assert!(h.queue.is_quieting_down());

    let id = h.schedule("compile").item;

    assert_eq!(h.stage(id), Some(Stage::Blocked));
    assert_eq!(h.blockage(id), Some(CauseOfBlockage::QuietingDown));
    assert!(node.executors()[0].is_idle());

    h.queue.quiet_down(false);

    assert_eq!(running_item(&node.executors()[0]), Some(id));
}

/// Dispatcher whose verdict tests can flip
struct Gate {
    verdict: PlMutex<Result<Option<String>, PolicyError>>,
    refuse_computer: Option<&'static str>,
}

impl Gate {
    fn new(verdict: Result<Option<String>, PolicyError>) -> Arc<Self> {
        Arc::new(Self {
            verdict: PlMutex::new(verdict),
            refuse_computer: None,
        })
    }

    fn set(&self, verdict: Result<Option<String>, PolicyError>) {
        *self.verdict.lock() = verdict;
    }
}

impl QueueTaskDispatcher for Gate {
    fn name(&self) -> &str {
        "gate"
    }

    fn can_run(&self, _item: &QueueItem, _task: &Task) -> Result<Option<String>, PolicyError> {
        self.verdict.lock().clone()
    }

    fn can_take(&self, computer: &Computer, _item: &QueueItem) -> Option<String> {
        (Some(computer.name().as_str()) == self.refuse_computer).then(|| "refused".to_string())
    }
}

#[test]
fn dispatcher_reason_blocks() {
    let h = harness(vec![task("compile")]);
    let gate = Gate::new(Ok(Some("maintenance window".into())));
    h.queue.add_dispatcher(gate.clone());

    let id = h.schedule("compile").item;

    assert_eq!(h.stage(id), Some(Stage::Blocked));
    assert_eq!(h.queue.item(id).unwrap().why().unwrap(), "maintenance window");

    gate.set(Ok(None));
    h.queue.maintain();
    assert_eq!(h.stage(id), Some(Stage::Buildable));
}

#[test]
fn dispatcher_error_is_transient_block() {
    let h = harness(vec![task("compile")]);
    let gate = Gate::new(Err(PolicyError("database down".into())));
    h.queue.add_dispatcher(gate.clone());

    let id = h.schedule("compile").item;
    h.queue.maintain();
    h.queue.maintain();

    assert_eq!(h.stage(id), Some(Stage::Blocked));
    assert_eq!(
        h.blockage(id),
        Some(CauseOfBlockage::PolicyError {
            source: "gate".into(),
            error: "database down".into()
        })
    );

    gate.set(Ok(None));
    h.queue.maintain();
    assert_eq!(h.stage(id), Some(Stage::Buildable));
}

#[test]
fn dispatcher_can_keep_item_off_a_computer() {
    let h = harness(vec![task("compile")]);
    h.queue.add_dispatcher(Arc::new(Gate {
        verdict: PlMutex::new(Ok(None)),
        refuse_computer: Some("agent-1"),
    }));
    let refused = h.add_computer(ComputerSpec::new("agent-1", 1));
    let other = h.add_computer(ComputerSpec::new("agent-2", 1));

    let id = h.schedule("compile").item;

    assert!(refused.executors()[0].is_idle());
    assert_eq!(running_item(&other.executors()[0]), Some(id));
}

#[test]
fn label_without_matching_computer() {
    let h = harness(vec![labelled_task("gpu-train", "gpu && linux")]);
    h.add_computer(ComputerSpec::new("agent-1", 1).label("linux"));

    let id = h.schedule("gpu-train").item;

    assert_eq!(h.stage(id), Some(Stage::Buildable));
    assert_eq!(
        h.blockage(id),
        Some(CauseOfBlockage::NoMatchingComputer {
            label: "gpu && linux".into()
        })
    );
}

#[test]
fn label_routes_to_matching_computer() {
    let h = harness(vec![labelled_task("win-build", "windows")]);
    let linux = h.add_computer(ComputerSpec::new("agent-1", 1).label("linux"));
    let windows = h.add_computer(ComputerSpec::new("agent-2", 1).label("windows"));

    let id = h.schedule("win-build").item;

    assert!(linux.executors()[0].is_idle());
    assert_eq!(running_item(&windows.executors()[0]), Some(id));
}

#[test]
fn exclusive_computer_skips_untied_tasks() {
    let h = harness(vec![task("compile")]);
    let node = h.add_computer(ComputerSpec::new("agent-1", 1).mode(NodeMode::Exclusive));

    let id = h.schedule("compile").item;

    assert!(node.executors()[0].is_idle());
    assert_eq!(
        h.blockage(id),
        Some(CauseOfBlockage::WaitingForExecutor { label: None })
    );
}

#[test]
fn offline_computer_takes_no_work() {
    let h = harness(vec![task("compile")]);
    let node = h.add_computer(ComputerSpec::new("agent-1", 1));
    node.set_online(false);

    let id = h.schedule("compile").item;
    assert!(node.executors()[0].is_idle());

    node.set_online(true);
    h.queue.maintain();
    assert_eq!(running_item(&node.executors()[0]), Some(id));
}
