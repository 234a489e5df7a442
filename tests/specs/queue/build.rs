//! Scheduling builds and waiting for their results.

use crate::prelude::*;

#[test]
fn successful_build_exits_zero() {
    let foreman = Foreman::with_definitions(BUILD_DEFINITIONS);

    foreman
        .fm()
        .args(&["schedule", "pass", "--wait"])
        .passes()
        .stdout_has("Scheduled pass as item 1")
        .stdout_has("Item 1 finished: SUCCESS");
}

#[test]
fn failed_build_sets_exit_code() {
    let foreman = Foreman::with_definitions(BUILD_DEFINITIONS);

    let run = foreman.fm().args(&["schedule", "fail", "--wait"]).fails();

    assert_eq!(run.code(), Some(1), "{}", foreman.daemon_log());
    assert!(run.stdout().contains("FAILURE"));
}

#[test]
fn wait_reports_result_as_json() {
    let foreman = Foreman::with_definitions(BUILD_DEFINITIONS);

    let run = foreman
        .fm()
        .args(&["schedule", "pass", "--wait", "-o", "json"])
        .passes();

    let json = run.json();
    assert_eq!(json["result"], "SUCCESS");
    assert_eq!(json["created"], true);
}

#[test]
fn unknown_task_is_rejected() {
    let foreman = Foreman::with_definitions(BUILD_DEFINITIONS);

    foreman
        .fm()
        .args(&["schedule", "deploy"])
        .fails()
        .stderr_has("deploy");
}

#[test]
fn repeated_schedule_merges_into_waiting_item() {
    let foreman = Foreman::with_definitions(BUILD_DEFINITIONS);

    foreman
        .fm()
        .args(&["schedule", "slow"])
        .passes()
        .stdout_eq("Scheduled slow as item 1\n");
    foreman
        .fm()
        .args(&["schedule", "slow"])
        .passes()
        .stdout_eq("Merged into queued item 1 of slow\n");

    foreman
        .fm()
        .args(&["queue"])
        .passes()
        .stdout_has("slow")
        .stdout_has("waiting");
}

#[test]
fn cancelled_item_does_not_run() {
    let foreman = Foreman::with_definitions(BUILD_DEFINITIONS);
    foreman.fm().args(&["schedule", "slow"]).passes();

    foreman
        .fm()
        .args(&["cancel", "1"])
        .passes()
        .stdout_eq("Cancelled item 1\n");

    foreman
        .fm()
        .args(&["queue"])
        .passes()
        .stdout_eq("Queue is empty\n");
    foreman
        .fm()
        .args(&["item", "#1"])
        .passes()
        .stdout_has("cancelled");
}

#[test]
fn queue_survives_restart() {
    let foreman = Foreman::with_definitions(BUILD_DEFINITIONS);
    foreman.fm().args(&["schedule", "slow"]).passes();

    foreman.fm().args(&["daemon", "restart"]).passes();

    let run = foreman.fm().args(&["queue", "-o", "json"]).passes();
    let items = run.json();
    let items = items.as_array().unwrap();
    assert_eq!(items.len(), 1, "{}", foreman.daemon_log());
    assert_eq!(items[0]["id"], 1);
}
