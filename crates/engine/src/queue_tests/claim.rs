// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn buildable_item_waits_for_an_executor() {
    let h = harness(vec![task("compile")]);
    let id = h.schedule("compile").item;

    for _ in 0..3 {
        h.advance(60);
        assert_eq!(h.stage(id), Some(Stage::Buildable));
    }
    assert_eq!(
        h.blockage(id),
        Some(CauseOfBlockage::WaitingForExecutor { label: None })
    );

    // Registering a computer runs one maintenance pass
    let node = h.add_computer(ComputerSpec::new("built-in", 1));

    assert!(h.queue.item(id).is_none());
    assert_eq!(running_item(&node.executors()[0]), Some(id));
    match h.queue.left_item(id).unwrap().outcome {
        LeftOutcome::Started { computer, executor } => {
            assert_eq!(computer, "built-in");
            assert_eq!(executor, 0);
        }
        LeftOutcome::Cancelled => panic!("expected started"),
    }
}

#[test]
fn finished_build_result_stays_with_left_item() {
    let h = harness(vec![task("compile")]);
    let node = h.add_computer(ComputerSpec::new("built-in", 1));
    let id = h.schedule("compile").item;
    assert_eq!(h.queue.left_item(id).unwrap().result, None);

    h.complete(&node.executors()[0], BuildResult::Unstable);

    assert!(h.queue.future(id).is_none());
    assert_eq!(
        h.queue.left_item(id).unwrap().result,
        Some(BuildResult::Unstable)
    );
}

#[test]
fn oldest_buildable_is_claimed_first() {
    let h = harness(vec![task("a"), task("b"), task("c")]);
    let a = h.schedule_quiet("a", 10).item;
    let b = h.schedule_quiet("b", 2).item;
    let c = h.schedule_quiet("c", 5).item;
    h.advance(2);
    h.advance(3);
    h.advance(5);
    let order: Vec<ItemId> = h.queue.buildable_items().iter().map(|i| i.id).collect();
    assert_eq!(order, vec![b, c, a]);

    let node = h.add_computer(ComputerSpec::new("built-in", 1));
    assert_eq!(running_item(&node.executors()[0]), Some(b));

    h.complete(&node.executors()[0], BuildResult::Success);
    assert_eq!(running_item(&node.executors()[0]), Some(c));

    h.complete(&node.executors()[0], BuildResult::Success);
    assert_eq!(running_item(&node.executors()[0]), Some(a));
}

#[test]
fn concurrent_maintenance_claims_at_most_once() {
    let h = harness(vec![task("compile")]);
    h.queue.quiet_down(true);
    let id = h.schedule("compile").item;
    let node = h.add_computer(ComputerSpec::new("built-in", 8));
    {
        let mut state = h.queue.state.lock();
        state.quieting_down = false;
    }

    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| h.queue.maintain());
        }
    });

    let running: Vec<ItemId> = node
        .executors()
        .iter()
        .filter_map(|e| running_item(e))
        .collect();
    assert_eq!(running, vec![id]);
    assert!(h.queue.is_empty());
}

#[test]
fn executors_are_filled_across_computers() {
    let h = harness(vec![concurrent_task("test")]);
    let a = h.add_computer(ComputerSpec::new("agent-1", 1));
    let b = h.add_computer(ComputerSpec::new("agent-2", 1));

    h.schedule("test");
    h.schedule("test");
    let third = h.schedule("test").item;

    assert!(a.executors()[0].is_busy());
    assert!(b.executors()[0].is_busy());
    assert_eq!(h.stage(third), Some(Stage::Buildable));
}

#[test]
fn count_buildable_for_label() {
    let h = harness(vec![
        labelled_task("linux-build", "linux"),
        labelled_task("linux-test", "linux"),
        task("anywhere"),
    ]);
    h.schedule("linux-build");
    h.schedule("linux-test");
    h.schedule("anywhere");

    let linux = Label::parse("linux").unwrap();
    assert_eq!(h.queue.count_buildable_for(Some(&linux)), 2);
    assert_eq!(h.queue.count_buildable_for(None), 1);
}

#[tokio::test]
async fn future_follows_item_into_build() {
    let h = harness(vec![task("compile")]);
    let node = h.add_computer(ComputerSpec::new("built-in", 1));
    let id = h.schedule("compile").item;

    let future = h.queue.future(id).unwrap();
    assert!(!future.is_done());

    h.complete(&node.executors()[0], BuildResult::Unstable);

    assert_eq!(future.wait().await, Ok(BuildResult::Unstable));
    assert!(h.queue.future(id).is_none());
    assert!(!h.queue.is_building("compile"));
}
