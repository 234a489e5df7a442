// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Queue item records, stages and causes of blockage.

use crate::cause::{Action, Cause};
use crate::id::{ComputerId, ItemId, TaskId};
use crate::result::BuildResult;
use crate::time_fmt::format_remaining_ms;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of an item that is still in the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Quiet period has not elapsed
    Waiting,
    /// Quiet period elapsed but a blocking predicate holds
    Blocked,
    /// Ready for an executor
    Buildable,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Waiting => write!(f, "waiting"),
            Stage::Blocked => write!(f, "blocked"),
            Stage::Buildable => write!(f, "buildable"),
        }
    }
}

/// Why an item is not running yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CauseOfBlockage {
    InQuietPeriod {
        remaining_ms: u64,
    },
    /// Non-concurrent task already has a build running
    BuildInProgress {
        task: TaskId,
    },
    /// A task listed in `block_on` is building
    BlockedByTask {
        task: TaskId,
    },
    /// The queue is quieting down and starts no new builds
    QuietingDown,
    /// A registered dispatcher refused the item
    Policy {
        source: String,
        reason: String,
    },
    /// A registered dispatcher failed; treated as a transient block
    PolicyError {
        source: String,
        error: String,
    },
    /// Buildable, but no idle executor can take it right now
    WaitingForExecutor {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// No online computer matches the label at all
    NoMatchingComputer {
        label: String,
    },
}

impl fmt::Display for CauseOfBlockage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CauseOfBlockage::InQuietPeriod { remaining_ms } => write!(
                f,
                "In the quiet period. Expires in {}",
                format_remaining_ms(*remaining_ms)
            ),
            CauseOfBlockage::BuildInProgress { task } => {
                write!(f, "A build of {} is already in progress", task)
            }
            CauseOfBlockage::BlockedByTask { task } => {
                write!(f, "Blocked by a running build of {}", task)
            }
            CauseOfBlockage::QuietingDown => {
                write!(f, "The scheduler is quieting down; no new builds start")
            }
            CauseOfBlockage::Policy { reason, .. } => write!(f, "{}", reason),
            CauseOfBlockage::PolicyError { source, error } => {
                write!(f, "Blockage check by {} failed: {}", source, error)
            }
            CauseOfBlockage::WaitingForExecutor { label: None } => {
                write!(f, "Waiting for next available executor")
            }
            CauseOfBlockage::WaitingForExecutor { label: Some(label) } => {
                write!(f, "Waiting for next available executor on {}", label)
            }
            CauseOfBlockage::NoMatchingComputer { label } => {
                write!(f, "There are no online computers with label '{}'", label)
            }
        }
    }
}

/// Read-only copy of a queue item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueItem {
    pub id: ItemId,
    pub task: TaskId,
    pub stage: Stage,
    pub submitted_at_ms: u64,
    /// End of the quiet period
    pub due_at_ms: u64,
    /// When the item left the waiting stage
    #[serde(default)]
    pub buildable_since_ms: Option<u64>,
    #[serde(default)]
    pub causes: Vec<Cause>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub blockage: Option<CauseOfBlockage>,
}

impl QueueItem {
    /// Human-readable reason the item is still queued
    pub fn why(&self) -> Option<String> {
        self.blockage.as_ref().map(|b| b.to_string())
    }
}

/// What became of an item after it left the queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LeftOutcome {
    Started { computer: ComputerId, executor: usize },
    Cancelled,
}

/// Record of an item that left the queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeftItem {
    pub id: ItemId,
    pub task: TaskId,
    pub causes: Vec<Cause>,
    pub left_at_ms: u64,
    #[serde(flatten)]
    pub outcome: LeftOutcome,
    /// Final result once a started build has finished
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<BuildResult>,
}

impl LeftItem {
    pub fn is_cancelled(&self) -> bool {
        matches!(self.outcome, LeftOutcome::Cancelled)
    }
}

#[cfg(test)]
#[path = "item_tests.rs"]
mod tests;
