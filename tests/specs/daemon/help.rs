//! fmd's own flags.

use crate::prelude::*;

#[test]
fn fmd_version() {
    let output = fmd_cmd().arg("--version").output().unwrap();

    assert!(output.status.success());
    similar_asserts::assert_eq!(
        String::from_utf8_lossy(&output.stdout).into_owned(),
        format!("fmd {}\n", env!("CARGO_PKG_VERSION"))
    );
}

#[test]
fn fmd_help_mentions_usage() {
    let output = fmd_cmd().arg("--help").output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("USAGE:"));
}

#[test]
fn fmd_rejects_unknown_arguments() {
    let output = fmd_cmd().arg("--bogus").output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("unexpected argument '--bogus'"));
}

#[test]
fn daemon_help_lists_subcommands() {
    cli()
        .args(&["daemon", "--help"])
        .passes()
        .stdout_has("start")
        .stdout_has("stop")
        .stdout_has("restart")
        .stdout_has("status")
        .stdout_has("logs");
}
