//! Quieting down holds buildable items back.

use crate::prelude::*;

#[test]
fn quiet_down_holds_items_until_resumed() {
    let foreman = Foreman::with_definitions(BUILD_DEFINITIONS);
    foreman
        .fm()
        .args(&["quiet-down"])
        .passes()
        .stdout_eq("Quieting down: no new builds start\n");

    foreman.fm().args(&["schedule", "pass"]).passes();
    foreman
        .fm()
        .args(&["queue"])
        .passes()
        .stdout_has("pass");
    foreman
        .fm()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("quieting down");

    foreman
        .fm()
        .args(&["quiet-down", "--off"])
        .passes()
        .stdout_eq("Quiet down cancelled: builds start again\n");
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || {
            foreman.fm().args(&["queue"]).passes().stdout() == "Queue is empty\n"
        }),
        "item never started\n{}",
        foreman.daemon_log()
    );
}

#[test]
fn offline_computer_takes_no_builds() {
    let foreman = Foreman::with_definitions(BUILD_DEFINITIONS);
    foreman
        .fm()
        .args(&["offline", "built-in"])
        .passes()
        .stdout_eq("built-in is offline\n");

    foreman.fm().args(&["schedule", "pass"]).passes();
    std::thread::sleep(std::time::Duration::from_millis(200));
    foreman
        .fm()
        .args(&["queue"])
        .passes()
        .stdout_has("pass");

    foreman.fm().args(&["online", "built-in"]).passes();
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || {
            foreman.fm().args(&["queue"]).passes().stdout() == "Queue is empty\n"
        }),
        "item never started\n{}",
        foreman.daemon_log()
    );
}
