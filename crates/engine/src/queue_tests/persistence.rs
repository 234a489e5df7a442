// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn record(id: u64, task: &str, stage: Stage) -> ItemRecord {
    ItemRecord {
        id: ItemId::new(id),
        task: TaskId::new(task),
        submitted_at_ms: 1_000,
        due_at_ms: 2_000,
        stage,
        causes: vec![Cause::Restarted],
        actions: Vec::new(),
    }
}

#[test]
fn snapshot_holds_queued_items_only() {
    let h = harness(vec![task("compile"), task("deploy"), task("lint")]);
    let node = h.add_computer(ComputerSpec::new("built-in", 1));
    let running = h.schedule("compile").item;
    let waiting = h.schedule_quiet("deploy", 30).item;
    let cancelled = h.schedule_quiet("lint", 30).item;
    h.queue.cancel(cancelled);
    assert_eq!(running_item(&node.executors()[0]), Some(running));

    let snapshot = h.queue.snapshot();

    let ids: Vec<ItemId> = snapshot.items.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![waiting]);
    assert_eq!(snapshot.next_id, 4);
    assert_eq!(snapshot.items[0].stage, Stage::Waiting);
    assert_eq!(snapshot.items[0].due_at_ms, h.clock.epoch_ms() + 30_000);
}

#[test]
fn restore_keeps_ids_and_continues_sequence() {
    let h = harness(vec![task("compile"), task("deploy")]);
    let snapshot = QueueSnapshot::new(
        12,
        vec![
            record(7, "compile", Stage::Buildable),
            record(9, "retired", Stage::Waiting),
            record(10, "deploy", Stage::Waiting),
        ],
    );

    assert_eq!(h.queue.restore(snapshot), 2);

    let ids: Vec<ItemId> = h.queue.items().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![ItemId::new(7), ItemId::new(10)]);
    assert_eq!(h.queue.item(ItemId::new(7)).unwrap().causes, vec![Cause::Restarted]);
    let next = h.schedule_quiet("compile", 0);
    // Parameters match, so the submission folds into the restored item
    assert_eq!(next.item, ItemId::new(7));
    assert!(!next.created);

    let fresh = h.schedule_quiet("deploy", 0);
    assert_eq!(fresh.item, ItemId::new(10));
    h.queue.clear();
    assert_eq!(h.schedule_quiet("compile", 5).item, ItemId::new(12));
}

#[test]
fn restore_uses_highest_id_when_next_id_is_stale() {
    let h = harness(vec![task("compile")]);
    let snapshot = QueueSnapshot::new(1, vec![record(41, "compile", Stage::Waiting)]);

    h.queue.restore(snapshot);
    h.queue.clear();

    assert_eq!(h.schedule_quiet("compile", 5).item, ItemId::new(42));
}

#[test]
fn restored_waiting_item_becomes_buildable_when_due() {
    let h = harness(vec![task("compile")]);
    let mut item = record(3, "compile", Stage::Waiting);
    item.due_at_ms = h.clock.epoch_ms() + 10_000;
    h.queue.restore(QueueSnapshot::new(4, vec![item]));
    assert_eq!(h.stage(ItemId::new(3)), Some(Stage::Waiting));

    h.advance(10);

    assert_eq!(h.stage(ItemId::new(3)), Some(Stage::Buildable));
}

#[test]
fn restored_item_runs_on_new_computer() {
    let h = harness(vec![task("compile")]);
    h.queue
        .restore(QueueSnapshot::new(6, vec![record(5, "compile", Stage::Buildable)]));

    let node = h.add_computer(ComputerSpec::new("built-in", 1));

    assert_eq!(running_item(&node.executors()[0]), Some(ItemId::new(5)));
    assert!(h.queue.is_empty());
}
