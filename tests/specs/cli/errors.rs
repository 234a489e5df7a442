//! Argument errors never reach the daemon.

use crate::prelude::*;

#[test]
fn unknown_command_fails() {
    cli().args(&["frobnicate"]).fails().stderr_has("frobnicate");
}

#[test]
fn parameter_without_equals_is_rejected() {
    cli()
        .args(&["schedule", "compile", "-p", "branch"])
        .fails()
        .stderr_has("expected key=value");
}

#[test]
fn item_id_must_be_numeric() {
    cli().args(&["cancel", "twelve"]).fails();
}

#[test]
fn interrupt_result_must_be_known() {
    cli()
        .args(&["interrupt", "built-in", "0", "--result", "EXPLODED"])
        .fails();
}

#[test]
fn queries_do_not_start_the_daemon() {
    let foreman = Foreman::empty();

    foreman
        .fm()
        .args(&["queue"])
        .fails()
        .stderr_has("not running");

    assert!(!foreman.pid_file_exists());
}
