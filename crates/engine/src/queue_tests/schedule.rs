// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn unknown_task_is_an_error() {
    let h = harness(vec![task("compile")]);
    let err = h.queue.schedule(ScheduleRequest::new("deploy")).unwrap_err();
    assert_eq!(err, QueueError::UnknownTask("deploy".into()));
    assert!(h.queue.is_empty());
}

#[test]
fn new_item_waits_out_quiet_period() {
    let h = harness(vec![task("compile")]);

    let scheduled = h.schedule_quiet("compile", 5);

    assert!(scheduled.created);
    let item = h.queue.item(scheduled.item).unwrap();
    assert_eq!(item.stage, Stage::Waiting);
    assert_eq!(item.due_at_ms, FakeClock::START_EPOCH_MS + 5_000);
    assert_eq!(
        item.blockage,
        Some(CauseOfBlockage::InQuietPeriod {
            remaining_ms: 5_000
        })
    );
    assert_eq!(h.queue.next_due(), Some(item.due_at_ms));
}

#[test]
fn item_becomes_buildable_exactly_when_quiet_period_ends() {
    let h = harness(vec![task("compile")]);
    let id = h.schedule_quiet("compile", 5).item;

    h.clock.advance(Duration::from_millis(4_999));
    h.queue.maintain();
    assert_eq!(h.stage(id), Some(Stage::Waiting));

    h.clock.advance(Duration::from_millis(1));
    h.queue.maintain();
    assert_eq!(h.stage(id), Some(Stage::Buildable));
    assert_eq!(h.queue.next_due(), None);
}

#[test]
fn ids_increase_and_are_never_reused() {
    let h = harness(vec![concurrent_task("t")]);
    let a = h.schedule_quiet("t", 10).item;
    let b = h.schedule_quiet("t", 10).item;
    h.queue.cancel(b);
    let c = h.schedule_quiet("t", 10).item;

    assert_eq!(a, ItemId::new(1));
    assert_eq!(b, ItemId::new(2));
    assert_eq!(c, ItemId::new(3));
}

#[yare::parameterized(
    request_wins = { Some(2), Some(7), 2_000 },
    task_default = { None, Some(7), 7_000 },
    queue_default = { None, None, 0 },
)]
fn quiet_period_precedence(request: Option<u64>, task_secs: Option<u64>, expected_ms: u64) {
    let t = match task_secs {
        Some(secs) => quiet_task("t", Duration::from_secs(secs)),
        None => task("t"),
    };
    let h = harness(vec![t]);
    let mut req = ScheduleRequest::new("t");
    if let Some(secs) = request {
        req = req.quiet_period(Duration::from_secs(secs));
    }

    let id = h.queue.schedule(req).unwrap().item;

    assert_eq!(
        h.queue.item(id).unwrap().due_at_ms,
        FakeClock::START_EPOCH_MS + expected_ms
    );
}

#[test]
fn non_concurrent_duplicate_merges() {
    let h = harness(vec![task("compile")]);

    let first = h
        .queue
        .schedule(
            ScheduleRequest::new("compile")
                .quiet_period(Duration::from_secs(10))
                .cause(Cause::Timer)
                .action(Action::note("origin", "cron")),
        )
        .unwrap();
    let second = h
        .queue
        .schedule(
            ScheduleRequest::new("compile")
                .quiet_period(Duration::from_secs(10))
                .cause(Cause::User {
                    name: "alice".into(),
                })
                .action(Action::note("origin", "cli")),
        )
        .unwrap();

    assert!(first.created);
    assert!(!second.created);
    assert_eq!(first.item, second.item);
    assert_eq!(h.queue.len(), 1);
    let item = h.queue.item(first.item).unwrap();
    assert_eq!(item.causes.len(), 2);
    assert_eq!(item.actions.len(), 2);
}

#[yare::parameterized(
    shorter_second = { 10, 2, 2_000 },
    longer_second  = { 2, 10, 2_000 },
)]
fn merge_keeps_earlier_due_time(first: u64, second: u64, expected_ms: u64) {
    let h = harness(vec![task("compile")]);
    let id = h.schedule_quiet("compile", first).item;

    h.schedule_quiet("compile", second);

    assert_eq!(
        h.queue.item(id).unwrap().due_at_ms,
        FakeClock::START_EPOCH_MS + expected_ms
    );
}

#[test]
fn different_parameters_do_not_merge() {
    let h = harness(vec![task("compile")]);
    let schedule = |branch: &str| {
        h.queue
            .schedule(
                ScheduleRequest::new("compile")
                    .quiet_period(Duration::from_secs(5))
                    .action(Action::parameters([("BRANCH", branch)])),
            )
            .unwrap()
    };

    let a = schedule("main");
    let b = schedule("release");
    let c = schedule("main");

    assert_ne!(a.item, b.item);
    assert_eq!(a.item, c.item);
    assert_eq!(h.queue.len(), 2);
}

#[test]
fn concurrent_tasks_never_merge() {
    let h = harness(vec![concurrent_task("test")]);

    let a = h.schedule_quiet("test", 5);
    let b = h.schedule_quiet("test", 5);

    assert!(b.created);
    assert_ne!(a.item, b.item);
    assert_eq!(h.queue.len(), 2);
}

#[test]
fn merge_into_blocked_item() {
    let h = harness(vec![task("compile")]);
    h.queue.quiet_down(true);
    let id = h.schedule_quiet("compile", 1).item;
    h.advance(1);
    assert_eq!(h.stage(id), Some(Stage::Blocked));

    let merged = h
        .queue
        .schedule(ScheduleRequest::new("compile").cause(Cause::Timer))
        .unwrap();

    assert!(!merged.created);
    assert_eq!(merged.item, id);
    assert_eq!(h.stage(id), Some(Stage::Blocked));
    assert_eq!(h.queue.item(id).unwrap().causes, vec![Cause::Timer]);
}

#[tokio::test]
async fn merged_futures_share_outcome() {
    let h = harness(vec![task("compile")]);
    let first = h.schedule_quiet("compile", 5);
    let second = h.schedule_quiet("compile", 5);

    h.queue.cancel(first.item);

    assert_eq!(first.future.wait().await, Err(BuildError::Cancelled));
    assert_eq!(second.future.wait().await, Err(BuildError::Cancelled));
}

struct Veto;

impl QueueDecisionHandler for Veto {
    fn name(&self) -> &str {
        "veto"
    }

    fn should_schedule(
        &self,
        task: &Task,
        _causes: &[Cause],
        actions: &[Action],
    ) -> Result<(), String> {
        if parameters_of(actions).contains_key("SKIP") {
            return Err(format!("{} skipped", task.id));
        }
        Ok(())
    }
}

#[test]
fn decision_handler_can_refuse() {
    let h = harness(vec![task("compile")]);
    h.queue.add_decision_handler(Arc::new(Veto));

    let err = h
        .queue
        .schedule(ScheduleRequest::new("compile").action(Action::parameters([("SKIP", "1")])))
        .unwrap_err();

    assert_eq!(
        err,
        QueueError::Refused {
            handler: "veto".into(),
            reason: "compile skipped".into()
        }
    );
    assert!(h.queue.is_empty());
    assert!(h.schedule_quiet("compile", 5).created);
}

#[test]
fn huge_quiet_period_never_comes_due() {
    let h = harness(vec![task("compile")]);

    let scheduled = h
        .queue
        .schedule(ScheduleRequest::new("compile").quiet_period(Duration::MAX))
        .unwrap();

    let item = h.queue.item(scheduled.item).unwrap();
    assert_eq!(item.stage, Stage::Waiting);
    assert_eq!(item.due_at_ms, u64::MAX);

    h.advance(365 * 24 * 3600);
    assert_eq!(h.stage(scheduled.item), Some(Stage::Waiting));
}

#[test]
fn racing_duplicates_merge_into_one_item() {
    let h = harness(vec![task("compile")]);
    h.queue.quiet_down(true);

    let results: Vec<Scheduled> = std::thread::scope(|s| {
        let handles: Vec<_> = (0..8).map(|_| s.spawn(|| h.schedule("compile"))).collect();
        handles.into_iter().map(|t| t.join().unwrap()).collect()
    });

    assert_eq!(h.queue.len(), 1);
    assert_eq!(results.iter().filter(|r| r.created).count(), 1);
    assert!(results.iter().all(|r| r.item == results[0].item));
}
