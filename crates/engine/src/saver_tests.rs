// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::queue::{Queue, ScheduleRequest};
use crate::registry::TaskRegistry;
use crate::test_support::FakeRunner;
use fm_core::test_support::task;
use fm_core::FakeClock;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Store that records every save and fails the first `failures` of them.
#[derive(Default)]
struct FakeStore {
    attempts: AtomicUsize,
    failures: usize,
    saved: Mutex<Vec<QueueSnapshot>>,
}

impl FakeStore {
    fn failing(failures: usize) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    fn saved(&self) -> Vec<QueueSnapshot> {
        self.saved.lock().clone()
    }
}

impl SnapshotStore for FakeStore {
    fn save(&self, snapshot: &QueueSnapshot) -> Result<CheckpointResult, CheckpointError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(CheckpointError::Io(std::io::Error::other("disk full")));
        }
        self.saved.lock().push(snapshot.clone());
        Ok(CheckpointResult {
            items: snapshot.items.len(),
            size_bytes: 64,
        })
    }
}

struct EmptySource;

impl SnapshotSource for EmptySource {
    fn snapshot(&self) -> QueueSnapshot {
        QueueSnapshot::new(1, Vec::new())
    }
}

fn saver_with(delay: SaverDelay, store: &Arc<FakeStore>, source: &Arc<EmptySource>) -> Saver {
    let saver = Saver::new(delay, store.clone());
    let weak = Arc::downgrade(source);
    let source: Weak<dyn SnapshotSource> = weak;
    saver.attach(source);
    saver
}

#[tokio::test(start_paused = true)]
async fn push_saves_after_delay() {
    let store = Arc::new(FakeStore::default());
    let source = Arc::new(EmptySource);
    let saver = saver_with(SaverDelay::After(Duration::from_secs(10)), &store, &source);
    let started = tokio::time::Instant::now();

    saver.push();
    assert_eq!(store.attempts(), 0);
    saver.next_save().wait().await;

    assert_eq!(store.attempts(), 1);
    assert!(started.elapsed() >= Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn pushes_within_delay_coalesce() {
    let store = Arc::new(FakeStore::default());
    let source = Arc::new(EmptySource);
    let saver = saver_with(SaverDelay::After(Duration::from_secs(10)), &store, &source);

    saver.push();
    tokio::time::sleep(Duration::from_secs(3)).await;
    saver.push();
    saver.push();
    saver.next_save().wait().await;
    tokio::time::sleep(Duration::from_secs(60)).await;

    assert_eq!(store.attempts(), 1);
}

#[tokio::test(start_paused = true)]
async fn push_after_save_schedules_another() {
    let store = Arc::new(FakeStore::default());
    let source = Arc::new(EmptySource);
    let saver = saver_with(SaverDelay::After(Duration::from_secs(1)), &store, &source);

    saver.push();
    saver.next_save().wait().await;
    saver.push();
    saver.next_save().wait().await;

    assert_eq!(store.attempts(), 2);
}

#[tokio::test(start_paused = true)]
async fn disabled_saver_never_saves() {
    let store = Arc::new(FakeStore::default());
    let source = Arc::new(EmptySource);
    let saver = saver_with(SaverDelay::Disabled, &store, &source);

    saver.push();
    // Nothing pending, so the future is already resolved
    saver.next_save().wait().await;
    tokio::time::sleep(Duration::from_secs(3600)).await;

    assert_eq!(store.attempts(), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_save_resolves_and_retries() {
    let store = Arc::new(FakeStore::failing(1));
    let source = Arc::new(EmptySource);
    let saver = saver_with(SaverDelay::After(Duration::from_secs(1)), &store, &source);

    saver.push();
    saver.next_save().wait().await;
    assert_eq!(store.attempts(), 1);
    assert!(store.saved().is_empty());

    let retry_started = tokio::time::Instant::now();
    saver.next_save().wait().await;

    assert_eq!(store.attempts(), 2);
    assert_eq!(store.saved().len(), 1);
    assert!(retry_started.elapsed() >= MIN_RETRY_DELAY);
}

#[tokio::test]
async fn save_now_without_source_is_noop() {
    let store = Arc::new(FakeStore::default());
    let source = Arc::new(EmptySource);
    let saver = saver_with(SaverDelay::After(Duration::ZERO), &store, &source);
    drop(source);

    assert_eq!(saver.save_now().await.unwrap(), None);
    assert_eq!(store.attempts(), 0);
}

#[tokio::test]
async fn save_now_reports_store_errors() {
    let store = Arc::new(FakeStore::failing(1));
    let source = Arc::new(EmptySource);
    let saver = saver_with(SaverDelay::Disabled, &store, &source);

    assert!(saver.save_now().await.is_err());
    assert_eq!(
        saver.save_now().await.unwrap(),
        Some(CheckpointResult {
            items: 0,
            size_bytes: 64
        })
    );
}

#[tokio::test(start_paused = true)]
async fn queue_changes_trigger_saves() {
    let mut registry = TaskRegistry::new();
    registry.register(task("compile"), FakeRunner::new().into_runner());
    let queue = Arc::new(Queue::new(
        Arc::new(registry),
        FakeClock::new(),
        Duration::from_secs(30),
    ));
    let store = Arc::new(FakeStore::default());
    let saver = Saver::new(SaverDelay::After(Duration::from_secs(5)), store.clone());
    let weak = Arc::downgrade(&queue);
    let source: Weak<dyn SnapshotSource> = weak;
    saver.attach(source);
    queue.add_listener(Arc::new(saver.clone()));

    let id = queue.schedule(ScheduleRequest::new("compile")).unwrap().item;
    saver.next_save().wait().await;

    let saved = store.saved();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].items[0].id, id);

    queue.cancel(id);
    saver.next_save().wait().await;

    let saved = store.saved();
    assert_eq!(saved.len(), 2);
    assert!(saved[1].items.is_empty());
    assert_eq!(saved[1].next_id, id.get() + 1);
}

#[yare::parameterized(
    negative = { -1, SaverDelay::Disabled },
    zero     = { 0, SaverDelay::After(Duration::ZERO) },
    minute   = { 60, SaverDelay::After(Duration::from_secs(60)) },
)]
fn delay_from_secs(secs: i64, expected: SaverDelay) {
    assert_eq!(SaverDelay::from_secs(secs), expected);
}

#[test]
fn default_delay_is_one_minute() {
    assert_eq!(SaverDelay::default(), SaverDelay::After(DEFAULT_SAVER_DELAY));
}
