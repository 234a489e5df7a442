// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::protocol::{read_response, write_request};
use fm_core::test_support::{concurrent_task, task};
use fm_core::{BuildResult, FakeClock, Stage};
use fm_engine::test_support::FakeRunner;
use fm_engine::{ComputerSpec, RuntimeConfig, TaskRegistry};
use std::collections::BTreeMap;
use tempfile::tempdir;

fn context(runner: &FakeRunner) -> ListenCtx<FakeClock> {
    let registry = TaskRegistry::new()
        .with(task("compile"), runner.clone().into_runner())
        .with(concurrent_task("test"), runner.clone().into_runner());
    let runtime = Runtime::new(registry, FakeClock::new(), RuntimeConfig::default(), None);
    ListenCtx {
        runtime: Arc::new(runtime),
        start_time: Instant::now(),
        shutdown: Arc::new(Notify::new()),
    }
}

fn schedule(task: &str) -> Request {
    Request::Schedule {
        task: task.to_string(),
        quiet_period_secs: None,
        parameters: BTreeMap::new(),
        user: Some("alice".to_string()),
    }
}

async fn scheduled_item(ctx: &ListenCtx<FakeClock>, request: Request) -> ItemId {
    match handle_request(request, ctx).await {
        Response::Scheduled { item, .. } => item,
        other => panic!("unexpected response: {:?}", other),
    }
}

#[tokio::test]
async fn ping_and_hello() {
    let ctx = context(&FakeRunner::new());

    assert_eq!(handle_request(Request::Ping, &ctx).await, Response::Pong);
    assert_eq!(
        handle_request(
            Request::Hello {
                version: "0.0.1".to_string()
            },
            &ctx
        )
        .await,
        Response::Hello {
            version: PROTOCOL_VERSION.to_string()
        }
    );
}

#[tokio::test]
async fn schedule_records_user_and_parameters() {
    let ctx = context(&FakeRunner::new());
    let request = Request::Schedule {
        task: "compile".to_string(),
        quiet_period_secs: Some(60),
        parameters: BTreeMap::from([("branch".to_string(), "main".to_string())]),
        user: Some("alice".to_string()),
    };

    let item = scheduled_item(&ctx, request).await;

    let queued = ctx.runtime.queue().item(item).unwrap();
    assert_eq!(queued.stage, Stage::Waiting);
    assert_eq!(
        queued.causes,
        vec![Cause::User {
            name: "alice".to_string()
        }]
    );
    assert_eq!(
        queued.actions,
        vec![Action::parameters([("branch", "main")])]
    );
}

#[tokio::test]
async fn schedule_unknown_task_is_an_error() {
    let ctx = context(&FakeRunner::new());

    let response = handle_request(schedule("nope"), &ctx).await;

    assert!(matches!(response, Response::Error { message } if message.contains("nope")));
}

#[tokio::test]
async fn repeated_schedule_merges() {
    let ctx = context(&FakeRunner::new());
    ctx.runtime.queue().quiet_down(true);

    let first = handle_request(schedule("compile"), &ctx).await;
    let second = handle_request(schedule("compile"), &ctx).await;

    assert_eq!(
        first,
        Response::Scheduled {
            item: ItemId::new(1),
            created: true
        }
    );
    assert_eq!(
        second,
        Response::Scheduled {
            item: ItemId::new(1),
            created: false
        }
    );
}

#[tokio::test]
async fn cancel_then_wait_reports_cancellation() {
    let ctx = context(&FakeRunner::new());
    ctx.runtime.queue().quiet_down(true);
    let item = scheduled_item(&ctx, schedule("compile")).await;

    assert_eq!(
        handle_request(Request::Cancel { item }, &ctx).await,
        Response::Cancelled { cancelled: true }
    );
    assert_eq!(
        handle_request(Request::Cancel { item }, &ctx).await,
        Response::Cancelled { cancelled: false }
    );

    let response = handle_request(Request::Wait { item }, &ctx).await;
    assert!(matches!(
        response,
        Response::Finished { result: None, error: Some(_), .. }
    ));
}

#[tokio::test]
async fn wait_returns_build_result() {
    let runner = FakeRunner::new().returning(BuildResult::Unstable);
    let ctx = context(&runner);
    ctx.runtime
        .add_computer(ComputerSpec::new("built-in", 1))
        .unwrap();
    ctx.runtime.queue().quiet_down(true);
    let item = scheduled_item(&ctx, schedule("compile")).await;

    // Subscribe while the item is still queued
    let waiting = handle_request(Request::Wait { item }, &ctx);
    tokio::pin!(waiting);
    tokio::select! {
        biased;
        response = &mut waiting => panic!("finished early: {:?}", response),
        _ = tokio::task::yield_now() => {}
    }
    ctx.runtime.queue().quiet_down(false);

    assert_eq!(
        waiting.await,
        Response::Finished {
            item,
            result: Some(BuildResult::Unstable),
            error: None
        }
    );
}

#[tokio::test]
async fn wait_after_build_finished_reports_result() {
    let runner = FakeRunner::new().returning(BuildResult::Failure);
    let ctx = context(&runner);
    ctx.runtime
        .add_computer(ComputerSpec::new("built-in", 1))
        .unwrap();
    let item = scheduled_item(&ctx, schedule("compile")).await;
    runner.wait_finished(1).await;
    // The build future settles just before the queue lets go of the item
    while ctx.runtime.queue().future(item).is_some() {
        tokio::task::yield_now().await;
    }

    assert_eq!(
        handle_request(Request::Wait { item }, &ctx).await,
        Response::Finished {
            item,
            result: Some(BuildResult::Failure),
            error: None
        }
    );
}

#[tokio::test]
async fn wait_for_unknown_item_is_an_error() {
    let ctx = context(&FakeRunner::new());

    let response = handle_request(
        Request::Wait {
            item: ItemId::new(99),
        },
        &ctx,
    )
    .await;

    assert!(matches!(response, Response::Error { .. }));
}

#[tokio::test]
async fn interrupt_running_build() {
    let runner = FakeRunner::holding();
    let ctx = context(&runner);
    ctx.runtime
        .add_computer(ComputerSpec::new("built-in", 1))
        .unwrap();
    let item = scheduled_item(&ctx, schedule("compile")).await;
    runner.wait_started(1).await;

    let response = handle_request(
        Request::Interrupt {
            computer: "built-in".to_string(),
            executor: 0,
            result: BuildResult::Aborted,
            user: Some("bob".to_string()),
        },
        &ctx,
    )
    .await;
    assert_eq!(response, Response::Interrupted { interrupted: true });

    let finished = handle_request(Request::Wait { item }, &ctx).await;
    assert_eq!(
        finished,
        Response::Finished {
            item,
            result: Some(BuildResult::Aborted),
            error: None
        }
    );
}

#[tokio::test]
async fn interrupt_unknown_computer_is_an_error() {
    let ctx = context(&FakeRunner::new());

    let response = handle_request(
        Request::Interrupt {
            computer: "ghost".to_string(),
            executor: 0,
            result: BuildResult::Aborted,
            user: None,
        },
        &ctx,
    )
    .await;

    assert!(matches!(response, Response::Error { .. }));
}

#[tokio::test]
async fn queue_item_and_status_views() {
    let runner = FakeRunner::holding();
    let ctx = context(&runner);
    ctx.runtime
        .add_computer(ComputerSpec::new("built-in", 1))
        .unwrap();
    let running = scheduled_item(&ctx, schedule("test")).await;
    let queued = scheduled_item(&ctx, schedule("test")).await;
    runner.wait_started(1).await;

    let Response::Queue { items } = handle_request(Request::Queue, &ctx).await else {
        panic!("expected queue");
    };
    assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![queued]);

    let Response::Item { queued: None, left: Some(left) } =
        handle_request(Request::Item { item: running }, &ctx).await
    else {
        panic!("expected left item");
    };
    assert!(!left.is_cancelled());

    let Response::Status(status) = handle_request(Request::Status, &ctx).await else {
        panic!("expected status");
    };
    assert_eq!(status.queued, 1);
    assert_eq!(status.buildable, 1);
    assert_eq!(status.executors_busy, 1);
    assert_eq!(status.executors_total, 1);
    assert!(!status.quieting_down);

    let Response::Executors { executors } = handle_request(Request::Executors, &ctx).await else {
        panic!("expected executors");
    };
    assert_eq!(executors[0].current.as_ref().map(|b| b.item), Some(running));

    runner.release();
}

#[tokio::test]
async fn quiet_down_and_offline_toggle() {
    let ctx = context(&FakeRunner::new());
    ctx.runtime
        .add_computer(ComputerSpec::new("built-in", 1))
        .unwrap();

    assert_eq!(
        handle_request(Request::QuietDown { on: true }, &ctx).await,
        Response::Ok
    );
    assert!(ctx.runtime.queue().is_quieting_down());

    assert_eq!(
        handle_request(
            Request::SetOffline {
                computer: "built-in".to_string(),
                offline: true
            },
            &ctx
        )
        .await,
        Response::Ok
    );
    assert!(!ctx.runtime.queue().computer("built-in").unwrap().is_online());

    let missing = handle_request(
        Request::SetOffline {
            computer: "ghost".to_string(),
            offline: true,
        },
        &ctx,
    )
    .await;
    assert!(matches!(missing, Response::Error { .. }));
}

#[tokio::test]
async fn shutdown_notifies_daemon() {
    let ctx = context(&FakeRunner::new());

    assert_eq!(
        handle_request(Request::Shutdown, &ctx).await,
        Response::ShuttingDown
    );
    // The stored permit wakes the next waiter immediately
    ctx.shutdown.notified().await;
}

#[tokio::test]
async fn serves_requests_over_socket() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("daemon.sock");
    let socket = UnixListener::bind(&path).unwrap();
    let listener = Listener::new(socket, context(&FakeRunner::new()));
    let task = tokio::spawn(listener.run());

    let stream = UnixStream::connect(&path).await.unwrap();
    let (mut reader, mut writer) = stream.into_split();
    write_request(&mut writer, &Request::Ping, DEFAULT_TIMEOUT)
        .await
        .unwrap();
    let response = read_response(&mut reader, Some(DEFAULT_TIMEOUT))
        .await
        .unwrap();

    assert_eq!(response, Response::Pong);
    task.abort();
}
