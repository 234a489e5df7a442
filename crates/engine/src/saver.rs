// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Delayed, crash-safe persistence of the queue.
//!
//! The saver listens to the queue. When an item enters the waiting stage or
//! leaves the queue it schedules a save after the configured delay, unless
//! one is already scheduled. A save copies the queue under its lock and
//! writes outside it on the blocking pool.

use crate::listener::QueueListener;
use fm_core::{LeftItem, QueueItem};
use fm_storage::{CheckpointError, CheckpointResult, CheckpointWriter, Checkpointer, QueueSnapshot};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default delay between a queue change and the save that records it
pub const DEFAULT_SAVER_DELAY: Duration = Duration::from_secs(60);

/// Lower bound on the delay before retrying a failed save
pub const MIN_RETRY_DELAY: Duration = Duration::from_secs(5);

/// When queue changes are written to disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaverDelay {
    /// Never save on changes
    Disabled,
    /// Save this long after the first unsaved change
    After(Duration),
}

impl SaverDelay {
    /// Negative seconds disable saving
    pub fn from_secs(secs: i64) -> Self {
        if secs < 0 {
            SaverDelay::Disabled
        } else {
            SaverDelay::After(Duration::from_secs(secs as u64))
        }
    }
}

impl Default for SaverDelay {
    fn default() -> Self {
        SaverDelay::After(DEFAULT_SAVER_DELAY)
    }
}

/// Something that can copy out the persisted part of the queue.
pub trait SnapshotSource: Send + Sync {
    fn snapshot(&self) -> QueueSnapshot;
}

/// Durable destination for queue snapshots.
pub trait SnapshotStore: Send + Sync + 'static {
    fn save(&self, snapshot: &QueueSnapshot) -> Result<CheckpointResult, CheckpointError>;
}

impl<W: CheckpointWriter> SnapshotStore for Checkpointer<W> {
    fn save(&self, snapshot: &QueueSnapshot) -> Result<CheckpointResult, CheckpointError> {
        Checkpointer::save(self, snapshot)
    }
}

/// Resolves when the save pending at the time of the call has finished,
/// whether it succeeded or not.
#[derive(Debug)]
pub struct SaveFuture {
    rx: Option<watch::Receiver<bool>>,
}

impl SaveFuture {
    pub async fn wait(self) {
        if let Some(mut rx) = self.rx {
            let _ = rx.wait_for(|done| *done).await;
        }
    }
}

#[derive(Default)]
struct SaverState {
    /// A delayed save has been scheduled and has not taken its snapshot yet
    scheduled: bool,
    /// Completion signal of the most recently scheduled save
    next: Option<watch::Receiver<bool>>,
}

struct SaverInner {
    delay: SaverDelay,
    store: Arc<dyn SnapshotStore>,
    source: Mutex<Option<Weak<dyn SnapshotSource>>>,
    state: Mutex<SaverState>,
}

#[derive(Clone)]
pub struct Saver {
    inner: Arc<SaverInner>,
}

impl Saver {
    pub fn new(delay: SaverDelay, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            inner: Arc::new(SaverInner {
                delay,
                store,
                source: Mutex::new(None),
                state: Mutex::new(SaverState::default()),
            }),
        }
    }

    /// Point the saver at the queue it persists.
    pub fn attach(&self, source: Weak<dyn SnapshotSource>) {
        *self.inner.source.lock() = Some(source);
    }

    pub fn delay(&self) -> SaverDelay {
        self.inner.delay
    }

    /// Future for the currently pending save; already resolved if none.
    pub fn next_save(&self) -> SaveFuture {
        SaveFuture {
            rx: self.inner.state.lock().next.clone(),
        }
    }

    /// Schedule a save unless one is already scheduled.
    pub fn push(&self) {
        let SaverDelay::After(delay) = self.inner.delay else {
            return;
        };
        self.push_after(delay);
    }

    fn push_after(&self, delay: Duration) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime, queue save skipped");
            return;
        };
        let done = {
            let mut state = self.inner.state.lock();
            if state.scheduled {
                return;
            }
            let (tx, rx) = watch::channel(false);
            state.scheduled = true;
            state.next = Some(rx);
            tx
        };
        debug!(delay_ms = delay.as_millis() as u64, "queue save scheduled");

        let saver = self.clone();
        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            // Changes from here on need a save of their own
            saver.inner.state.lock().scheduled = false;

            if let Err(e) = saver.save_now().await {
                let retry = delay.max(MIN_RETRY_DELAY);
                warn!(error = %e, retry_ms = retry.as_millis() as u64, "queue save failed");
                saver.push_after(retry);
            }

            let _ = done.send(true);
            let mut state = saver.inner.state.lock();
            if state
                .next
                .as_ref()
                .is_some_and(|rx| rx.same_channel(&done.subscribe()))
            {
                state.next = None;
            }
        });
    }

    /// Snapshot the queue and write it now. Does nothing once the queue is gone.
    pub async fn save_now(&self) -> Result<Option<CheckpointResult>, CheckpointError> {
        let source = self.inner.source.lock().as_ref().and_then(Weak::upgrade);
        let Some(source) = source else {
            return Ok(None);
        };
        let snapshot = source.snapshot();
        drop(source);

        let store = self.inner.store.clone();
        let result = tokio::task::spawn_blocking(move || store.save(&snapshot))
            .await
            .map_err(|e| CheckpointError::Io(std::io::Error::other(e.to_string())))??;
        info!(
            items = result.items,
            size_bytes = result.size_bytes,
            "queue saved"
        );
        Ok(Some(result))
    }
}

impl QueueListener for Saver {
    fn on_enter_waiting(&self, _item: &QueueItem) {
        self.push();
    }

    fn on_left(&self, _item: &LeftItem) {
        self.push();
    }
}

#[cfg(test)]
#[path = "saver_tests.rs"]
mod tests;
