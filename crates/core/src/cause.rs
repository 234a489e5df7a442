// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Causes, actions and interruption causes attached to queue items and builds.

use crate::id::{ItemId, TaskId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Why an item was put in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Cause {
    /// Started by a named user
    User { name: String },
    /// Started by a periodic trigger
    Timer,
    /// Started because another task's build finished
    Upstream { task: TaskId, item: ItemId },
    /// Started by a remote trigger
    Remote {
        host: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        note: Option<String>,
    },
    /// Re-queued after the scheduler restarted
    Restarted,
}

impl fmt::Display for Cause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cause::User { name } => write!(f, "Started by user {}", name),
            Cause::Timer => write!(f, "Started by timer"),
            Cause::Upstream { task, item } => {
                write!(f, "Started by upstream task {} (item #{})", task, item)
            }
            Cause::Remote { host, note: None } => write!(f, "Started by remote host {}", host),
            Cause::Remote {
                host,
                note: Some(note),
            } => write!(f, "Started by remote host {} with note: {}", host, note),
            Cause::Restarted => write!(f, "Re-queued after restart"),
        }
    }
}

/// Metadata contributed to a queue item by its submitter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Build parameters.
    ///
    /// Two submissions with different parameters are never merged into one item.
    Parameters { values: BTreeMap<String, String> },
    /// Free-form key/value annotation
    Note { key: String, value: String },
}

impl Action {
    pub fn parameters<K, V>(values: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Action::Parameters {
            values: values
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn note(key: impl Into<String>, value: impl Into<String>) -> Self {
        Action::Note {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Merged build parameters from a list of actions (later actions win).
pub fn parameters_of(actions: &[Action]) -> BTreeMap<String, String> {
    let mut merged = BTreeMap::new();
    for action in actions {
        if let Action::Parameters { values } = action {
            merged.extend(values.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
    }
    merged
}

/// Why a running build was interrupted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CauseOfInterruption {
    /// A user asked for the interruption
    User { name: String },
    /// The queue item was cancelled after it had started
    Cancelled,
    /// The scheduler is shutting down
    Shutdown,
    /// The computer running the build went offline
    ComputerOffline,
}

impl fmt::Display for CauseOfInterruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CauseOfInterruption::User { name } => write!(f, "Aborted by {}", name),
            CauseOfInterruption::Cancelled => write!(f, "Queue item cancelled"),
            CauseOfInterruption::Shutdown => write!(f, "Scheduler shutting down"),
            CauseOfInterruption::ComputerOffline => write!(f, "Computer went offline"),
        }
    }
}

#[cfg(test)]
#[path = "cause_tests.rs"]
mod tests;
