//! Starting, inspecting and stopping the daemon.

use crate::prelude::*;

#[test]
fn status_without_daemon() {
    let foreman = Foreman::empty();

    foreman
        .fm()
        .args(&["daemon", "status"])
        .passes()
        .stdout_eq("Daemon not running\n");
}

#[test]
fn status_without_daemon_as_json() {
    let foreman = Foreman::empty();

    let run = foreman.fm().args(&["daemon", "status", "-o", "json"]).passes();

    assert_eq!(run.json()["status"], "not_running");
}

#[test]
fn stop_without_daemon() {
    let foreman = Foreman::empty();

    foreman
        .fm()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_eq("Daemon not running\n");
}

#[test]
fn start_status_stop() {
    let foreman = Foreman::empty();

    foreman
        .fm()
        .args(&["daemon", "start"])
        .passes()
        .stdout_has("Daemon started");
    assert!(foreman.pid_file_exists());

    foreman
        .fm()
        .args(&["daemon", "status"])
        .passes()
        .stdout_has("Status: running")
        .stdout_has(&format!("Version: {}", env!("CARGO_PKG_VERSION")));

    foreman
        .fm()
        .args(&["daemon", "stop"])
        .passes()
        .stdout_has("Daemon stopped");
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || !foreman.pid_file_exists()),
        "pid file left behind\n{}",
        foreman.daemon_log()
    );
}

#[test]
fn missing_definitions_get_a_built_in_node() {
    let foreman = Foreman::empty();
    foreman.fm().args(&["daemon", "start"]).passes();

    let run = foreman.fm().args(&["executors", "-o", "json"]).passes();

    let executors = run.json();
    let executors = executors.as_array().unwrap();
    assert_eq!(executors.len(), 2, "{}", foreman.daemon_log());
    assert!(executors.iter().all(|e| e["computer"] == "built-in"));
}

#[test]
fn invalid_definitions_fail_startup() {
    let foreman = Foreman::with_definitions("[[task]]\nname = \"x\"\nscript = \"\"\n");

    foreman
        .fm()
        .args(&["daemon", "start"])
        .fails()
        .stderr_has("empty script");
    assert!(!foreman.pid_file_exists());
}

#[test]
fn logs_show_startup() {
    let foreman = Foreman::empty();
    foreman.fm().args(&["daemon", "start"]).passes();

    foreman
        .fm()
        .args(&["daemon", "logs"])
        .passes()
        .stdout_has("Starting daemon");
}
