// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[tokio::test]
async fn cancel_queued_item() {
    let h = harness(vec![task("compile")]);
    let scheduled = h.schedule_quiet("compile", 5);

    assert!(h.queue.cancel(scheduled.item));

    assert!(h.queue.is_empty());
    assert_eq!(scheduled.future.wait().await, Err(BuildError::Cancelled));
    let left = h.queue.left_item(scheduled.item).unwrap();
    assert!(left.is_cancelled());
    assert_eq!(left.task, "compile");
}

#[test]
fn cancel_is_idempotent() {
    let h = harness(vec![task("compile"), task("deploy")]);
    let id = h.schedule_quiet("compile", 5).item;
    let other = h.schedule_quiet("deploy", 5).item;
    assert!(h.queue.cancel(id));
    let before = h.queue.items();

    assert!(!h.queue.cancel(id));
    assert!(!h.queue.cancel(id));

    assert_eq!(h.queue.items(), before);
    assert_eq!(h.queue.items()[0].id, other);
}

#[test]
fn cancel_unknown_item() {
    let h = harness(vec![task("compile")]);
    assert!(!h.queue.cancel(ItemId::new(99)));
    assert!(h.queue.left_item(ItemId::new(99)).is_none());
}

#[yare::parameterized(
    waiting   = { 5, false },
    blocked   = { 0, true },
    buildable = { 0, false },
)]
fn cancel_from_any_queued_stage(quiet_secs: u64, quiet_down: bool) {
    let h = harness(vec![task("compile")]);
    h.queue.quiet_down(quiet_down);
    let id = h.schedule_quiet("compile", quiet_secs).item;
    assert!(h.queue.item(id).is_some());

    assert!(h.queue.cancel(id));
    assert!(h.queue.item(id).is_none());
}

#[test]
fn cancel_running_item_interrupts_executor() {
    let h = harness(vec![task("compile")]);
    let node = h.add_computer(ComputerSpec::new("built-in", 1));
    let id = h.schedule("compile").item;
    let executor = &node.executors()[0];
    assert_eq!(running_item(executor), Some(id));

    assert!(!h.queue.cancel(id));

    let interruption = executor.interruption().unwrap();
    assert_eq!(interruption.result, BuildResult::Aborted);
    assert_eq!(interruption.causes, vec![CauseOfInterruption::Cancelled]);
    assert_eq!(h.complete(executor, BuildResult::Success), id);
}

#[test]
fn cancelled_item_never_builds() {
    let h = harness(vec![task("compile")]);
    let id = h.schedule_quiet("compile", 5).item;
    h.queue.cancel(id);

    let node = h.add_computer(ComputerSpec::new("built-in", 1));
    h.advance(10);

    assert!(node.executors()[0].is_idle());
}

#[test]
fn cancel_task_and_clear() {
    let h = harness(vec![concurrent_task("test"), task("lint")]);
    h.schedule_quiet("test", 5);
    h.schedule_quiet("test", 5);
    h.schedule_quiet("lint", 5);

    assert_eq!(h.queue.cancel_task("test"), 2);
    assert!(!h.queue.contains("test"));
    assert!(h.queue.contains("lint"));

    assert_eq!(h.queue.clear(), 1);
    assert!(h.queue.is_empty());
}

#[test]
fn left_items_expire() {
    let h = harness(vec![task("compile")]);
    let id = h.schedule_quiet("compile", 5).item;
    h.queue.cancel(id);

    h.clock.advance(LEFT_ITEM_TTL);
    // Expiry happens when the next item leaves
    let other = h.schedule_quiet("compile", 5).item;
    h.queue.cancel(other);

    assert!(h.queue.left_item(id).is_none());
    assert!(h.queue.left_item(other).is_some());
}
