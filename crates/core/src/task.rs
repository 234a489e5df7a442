// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task definitions: the unit of work the queue schedules.

use crate::id::TaskId;
use crate::label::Label;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A buildable unit of work.
///
/// Tasks are owned by the task registry and are immutable once an item
/// referencing them is in the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub display_name: String,
    /// Node affinity; `None` runs anywhere
    #[serde(default)]
    pub label: Option<Label>,
    /// Allow more than one build of this task at a time
    #[serde(default)]
    pub concurrent: bool,
    /// Default quiet period when the caller does not pass one
    #[serde(default, with = "opt_duration_ms")]
    pub quiet_period: Option<Duration>,
    /// Expected build time, for display only
    #[serde(default, with = "opt_duration_ms")]
    pub estimated_duration: Option<Duration>,
    /// Tasks whose running builds keep this task blocked
    #[serde(default)]
    pub block_on: Vec<TaskId>,
}

impl Task {
    pub fn new(id: impl Into<TaskId>) -> Self {
        let id = id.into();
        Self {
            display_name: id.to_string(),
            id,
            label: None,
            concurrent: false,
            quiet_period: None,
            estimated_duration: None,
            block_on: Vec::new(),
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    pub fn with_label(mut self, label: Label) -> Self {
        self.label = Some(label);
        self
    }

    pub fn with_concurrent(mut self, concurrent: bool) -> Self {
        self.concurrent = concurrent;
        self
    }

    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.quiet_period = Some(quiet_period);
        self
    }

    pub fn with_estimated_duration(mut self, duration: Duration) -> Self {
        self.estimated_duration = Some(duration);
        self
    }

    pub fn blocked_by(mut self, task: impl Into<TaskId>) -> Self {
        self.block_on.push(task.into());
        self
    }
}

mod opt_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => s.serialize_some(&(d.as_millis() as u64)),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(d)?.map(Duration::from_millis))
    }
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
