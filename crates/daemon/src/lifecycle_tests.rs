// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use fm_core::{Cause, ItemId, Stage, TaskId};
use fm_engine::ScheduleRequest;
use fm_storage::{ItemRecord, QueueSnapshot};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::tempdir;

const DEFINITIONS: &str = r#"
[queue]
shutdown_grace_secs = 1

[[task]]
name = "compile"
quiet_period_secs = 3600
script = "true"

[[task]]
name = "lint"
quiet_period_secs = 3600
script = "true"
"#;

fn config_with_definitions(dir: &Path) -> Config {
    let config = Config::for_state_dir(dir.to_path_buf());
    std::fs::write(&config.definitions_path, DEFINITIONS).unwrap();
    config
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_millis() as u64
}

#[test]
fn paths_live_under_state_dir() {
    let config = Config::for_state_dir(PathBuf::from("/tmp/fm-state"));

    assert_eq!(config.socket_path, PathBuf::from("/tmp/fm-state/daemon.sock"));
    assert_eq!(config.lock_path, PathBuf::from("/tmp/fm-state/daemon.pid"));
    assert_eq!(config.snapshot_path, PathBuf::from("/tmp/fm-state/queue.zst"));
    assert_eq!(
        config.definitions_path,
        PathBuf::from("/tmp/fm-state/foreman.toml")
    );
    assert_eq!(config.logs_path, PathBuf::from("/tmp/fm-state/logs"));
}

#[tokio::test]
async fn startup_writes_runtime_files() {
    let dir = tempdir().unwrap();
    let config = Config::for_state_dir(dir.path().join("state"));

    let StartupResult { mut daemon, .. } = startup(&config).await.unwrap();

    let pid = std::fs::read_to_string(&config.lock_path).unwrap();
    assert_eq!(pid.trim(), std::process::id().to_string());
    assert_eq!(
        std::fs::read_to_string(&config.version_path).unwrap(),
        PROTOCOL_VERSION
    );
    assert!(config.socket_path.exists());
    assert!(config.logs_path.is_dir());

    // No definitions file: one built-in node
    let executors = daemon.runtime.executors();
    assert_eq!(executors.len(), crate::config::BUILT_IN_EXECUTORS);
    assert!(executors
        .iter()
        .all(|e| e.computer.as_str() == crate::config::BUILT_IN_NODE));

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn second_daemon_fails_to_lock() {
    let dir = tempdir().unwrap();
    let config = Config::for_state_dir(dir.path().to_path_buf());
    let StartupResult { mut daemon, .. } = startup(&config).await.unwrap();

    let err = startup(&config).await.err().unwrap();

    assert!(matches!(err, LifecycleError::LockFailed(_)));
    // The running daemon keeps its files
    assert!(config.socket_path.exists());
    assert!(config.version_path.exists());
    assert_eq!(
        std::fs::read_to_string(&config.lock_path).unwrap().trim(),
        std::process::id().to_string()
    );

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_definitions_fail_and_clean_up() {
    let dir = tempdir().unwrap();
    let config = Config::for_state_dir(dir.path().to_path_buf());
    std::fs::write(&config.definitions_path, "[[task]]\nname = ").unwrap();

    let err = startup(&config).await.err().unwrap();

    assert!(matches!(err, LifecycleError::Config(_)));
    assert!(!config.lock_path.exists());
    assert!(!config.version_path.exists());
    assert!(!config.socket_path.exists());
}

#[tokio::test]
async fn restores_saved_queue() {
    let dir = tempdir().unwrap();
    let config = config_with_definitions(dir.path());
    let due = now_ms() + 3_600_000;
    let record = |id: u64, task: &str| ItemRecord {
        id: ItemId::new(id),
        task: TaskId::new(task),
        submitted_at_ms: due - 3_600_000,
        due_at_ms: due,
        stage: Stage::Waiting,
        causes: vec![Cause::User {
            name: "alice".to_string(),
        }],
        actions: Vec::new(),
    };
    let snapshot = QueueSnapshot::new(8, vec![record(5, "compile"), record(7, "retired")]);
    Checkpointer::new(config.snapshot_path.clone())
        .save(&snapshot)
        .unwrap();

    let StartupResult { mut daemon, .. } = startup(&config).await.unwrap();
    let queue = daemon.runtime.queue();

    // The retired task's item is gone; ids keep counting from the snapshot
    let restored = queue.item(ItemId::new(5)).unwrap();
    assert_eq!(restored.stage, Stage::Waiting);
    assert!(queue.item(ItemId::new(7)).is_none());
    let scheduled = queue.schedule(ScheduleRequest::new("lint")).unwrap();
    assert_eq!(scheduled.item, ItemId::new(8));

    daemon.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_saves_queue_and_removes_files() {
    let dir = tempdir().unwrap();
    let config = config_with_definitions(dir.path());
    let StartupResult { mut daemon, .. } = startup(&config).await.unwrap();
    daemon
        .runtime
        .queue()
        .schedule(ScheduleRequest::new("compile"))
        .unwrap();

    daemon.shutdown().await.unwrap();

    assert!(!config.socket_path.exists());
    assert!(!config.lock_path.exists());
    assert!(!config.version_path.exists());

    let saved = load_snapshot(&config.snapshot_path).unwrap().unwrap();
    assert_eq!(saved.items.len(), 1);
    assert_eq!(saved.items[0].task, TaskId::new("compile"));
    assert_eq!(saved.items[0].stage, Stage::Waiting);
}
