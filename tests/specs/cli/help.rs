//! Help and version output.

use crate::prelude::*;

#[test]
fn no_arguments_prints_help() {
    cli()
        .passes()
        .stdout_has("Usage: fm")
        .stdout_has("schedule")
        .stdout_has("quiet-down");
}

#[test]
fn help_lists_every_command() {
    let run = cli().args(&["--help"]).passes();
    for command in [
        "schedule",
        "cancel",
        "queue",
        "item",
        "executors",
        "interrupt",
        "quiet-down",
        "offline",
        "online",
        "daemon",
    ] {
        assert!(
            run.stdout().contains(command),
            "help is missing '{command}':\n{}",
            run.stdout()
        );
    }
}

#[test]
fn version_prints_package_version() {
    cli()
        .args(&["--version"])
        .passes()
        .stdout_eq(&format!("fm {}\n", env!("CARGO_PKG_VERSION")));
}

#[test]
fn schedule_help_documents_wait() {
    cli()
        .args(&["schedule", "--help"])
        .passes()
        .stdout_has("--wait")
        .stdout_has("--quiet-period")
        .stdout_has("--param");
}
