// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Observers of queue transitions and build lifecycles.
//!
//! Listeners are called after the queue lock is released, in registration
//! order. They must not block.

use crate::executor::Executable;
use fm_core::{BuildResult, LeftItem, QueueItem};
use parking_lot::RwLock;
use std::sync::Arc;

/// Observes items moving between queue stages.
pub trait QueueListener: Send + Sync {
    fn on_enter_waiting(&self, _item: &QueueItem) {}

    fn on_enter_blocked(&self, _item: &QueueItem) {}

    fn on_enter_buildable(&self, _item: &QueueItem) {}

    /// The item left the queue, either to start or because it was cancelled.
    fn on_left(&self, _item: &LeftItem) {}
}

/// Observes builds on executors.
pub trait RunListener: Send + Sync {
    fn on_started(&self, _build: &Executable) {}

    /// Called once the final result, including any interruption, is sealed.
    fn on_completed(&self, _build: &Executable, _result: BuildResult) {}
}

/// Registered run listeners, shared by every executor loop.
#[derive(Default)]
pub(crate) struct RunListeners {
    listeners: RwLock<Vec<Arc<dyn RunListener>>>,
}

impl RunListeners {
    pub(crate) fn add(&self, listener: Arc<dyn RunListener>) {
        self.listeners.write().push(listener);
    }

    pub(crate) fn started(&self, build: &Executable) {
        for listener in self.listeners.read().iter() {
            listener.on_started(build);
        }
    }

    pub(crate) fn completed(&self, build: &Executable, result: BuildResult) {
        for listener in self.listeners.read().iter() {
            listener.on_completed(build, result);
        }
    }
}
