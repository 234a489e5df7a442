// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::test_support::task;
use fm_core::Action;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

fn context(item: u64, actions: Vec<Action>) -> RunContext {
    RunContext {
        item: ItemId::new(item),
        task: Arc::new(task("compile")),
        causes: Vec::new(),
        actions,
        computer: "built-in".into(),
        executor: 1,
        cancel: CancellationToken::new(),
    }
}

#[yare::parameterized(
    success        = { "exit 0", None, BuildResult::Success },
    failure        = { "exit 1", None, BuildResult::Failure },
    unstable       = { "exit 3", Some(3), BuildResult::Unstable },
    other_failure  = { "exit 4", Some(3), BuildResult::Failure },
)]
#[test_macro(tokio::test)]
async fn exit_code_maps_to_result(script: &str, unstable: Option<i32>, expected: BuildResult) {
    let dir = tempdir().unwrap();
    let runner = ShellRunner::new(script, dir.path().to_path_buf()).with_unstable_exit_code(unstable);

    let result = runner.run(context(1, Vec::new())).await.unwrap();

    assert_eq!(result, expected);
}

#[tokio::test]
async fn output_goes_to_build_log() {
    let dir = tempdir().unwrap();
    let runner = ShellRunner::new(
        "echo \"$FM_TASK #$FM_ITEM on $FM_COMPUTER/$FM_EXECUTOR branch=$BRANCH\"; echo oops >&2",
        dir.path().to_path_buf(),
    );
    let actions = vec![Action::parameters([("BRANCH", "main")])];

    runner.run(context(7, actions)).await.unwrap();

    let log = std::fs::read_to_string(build_log_path(dir.path(), "compile", ItemId::new(7))).unwrap();
    assert!(log.contains("compile #7 on built-in/1 branch=main"));
    assert!(log.contains("oops"));
}

#[tokio::test]
async fn cancellation_kills_script() {
    let dir = tempdir().unwrap();
    let runner = ShellRunner::new("sleep 30", dir.path().to_path_buf());
    let ctx = context(2, Vec::new());
    let cancel = ctx.cancel.clone();

    let run = tokio::spawn(async move { runner.run(ctx).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    cancel.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, Err(RunError::Interrupted)));
}

/// Running and not a zombie
#[cfg(target_os = "linux")]
fn process_running(pid: u32) -> bool {
    std::fs::read_to_string(format!("/proc/{}/stat", pid))
        .ok()
        .and_then(|stat| {
            let (_, rest) = stat.rsplit_once(')')?;
            rest.trim_start().chars().next()
        })
        .is_some_and(|state| state != 'Z')
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn cancellation_kills_background_children() {
    let dir = tempdir().unwrap();
    let pid_file = dir.path().join("child.pid");
    let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());
    let runner = ShellRunner::new(script, dir.path().join("logs"));
    let ctx = context(3, Vec::new());
    let cancel = ctx.cancel.clone();

    let run = tokio::spawn(async move { runner.run(ctx).await });
    let mut pid = None;
    for _ in 0..100 {
        if let Some(p) = std::fs::read_to_string(&pid_file)
            .ok()
            .and_then(|s| s.trim().parse::<u32>().ok())
        {
            pid = Some(p);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let pid = pid.unwrap();
    cancel.cancel();

    let outcome = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap();
    assert!(matches!(outcome, Err(RunError::Interrupted)));

    let mut gone = false;
    for _ in 0..100 {
        if !process_running(pid) {
            gone = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(gone, "background child {} survived cancellation", pid);
}

#[test]
fn build_log_path_is_per_task_and_item() {
    let path = build_log_path(Path::new("/state/logs"), "deploy", ItemId::new(42));

    assert_eq!(path, PathBuf::from("/state/logs/deploy/42.log"));
}
