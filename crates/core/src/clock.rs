// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Clock abstraction for testable time

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Source of time for the queue.
///
/// Quiet periods are tracked in wall-clock epoch milliseconds so that due
/// times survive a restart; `now()` is used for elapsed-time measurements.
pub trait Clock: Clone + Send + Sync + 'static {
    /// Monotonic instant
    fn now(&self) -> Instant;

    /// Wall-clock milliseconds since the Unix epoch
    fn epoch_ms(&self) -> u64;
}

/// Real system clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

#[derive(Debug)]
struct FakeTime {
    instant: Instant,
    epoch_ms: u64,
}

/// Manually advanced clock for tests.
///
/// Clones share the same underlying time.
#[derive(Debug, Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeTime>>,
}

impl FakeClock {
    /// Epoch the fake clock starts at
    pub const START_EPOCH_MS: u64 = 1_000_000;

    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeTime {
                instant: Instant::now(),
                epoch_ms: Self::START_EPOCH_MS,
            })),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        let mut t = self.inner.lock();
        t.instant += by;
        t.epoch_ms += by.as_millis() as u64;
    }

    /// Jump the wall clock to an absolute epoch time (monotonic time follows).
    pub fn set_epoch_ms(&self, epoch_ms: u64) {
        let mut t = self.inner.lock();
        if epoch_ms > t.epoch_ms {
            let gap = Duration::from_millis(epoch_ms - t.epoch_ms);
            t.instant += gap;
        }
        t.epoch_ms = epoch_ms;
    }
}

impl Default for FakeClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.inner.lock().instant
    }

    fn epoch_ms(&self) -> u64 {
        self.inner.lock().epoch_ms
    }
}

#[cfg(test)]
#[path = "clock_tests.rs"]
mod tests;
