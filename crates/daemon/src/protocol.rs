// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! IPC protocol between `fm` and `fmd`.
//!
//! Wire format: 4-byte length prefix (big-endian) + JSON payload

use std::collections::BTreeMap;

use fm_core::{BuildResult, ItemId, LeftItem, QueueItem};
pub use fm_engine::{Executable, ExecutorInfo, Interruption};
use serde::{Deserialize, Serialize};

#[path = "protocol_wire.rs"]
mod wire;
pub use wire::{
    decode, encode, read_message, read_request, read_response, write_message, write_request,
    write_response, ProtocolError, DEFAULT_TIMEOUT, MAX_MESSAGE_SIZE, PROTOCOL_VERSION,
};

/// Request from CLI to daemon
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Request {
    /// Health check ping
    Ping,

    /// Version handshake
    Hello { version: String },

    /// Put a task in the queue
    Schedule {
        task: String,
        /// Overrides the task's quiet period
        #[serde(default)]
        quiet_period_secs: Option<u64>,
        #[serde(default)]
        parameters: BTreeMap<String, String>,
        /// User recorded as the cause
        #[serde(default)]
        user: Option<String>,
    },

    /// Cancel a queued item, or abort it if it is running
    Cancel { item: ItemId },

    /// Block until an item's build finishes
    Wait { item: ItemId },

    /// Interrupt the build on one executor
    Interrupt {
        computer: String,
        executor: usize,
        result: BuildResult,
        #[serde(default)]
        user: Option<String>,
    },

    /// Stop (or resume) starting new builds
    QuietDown { on: bool },

    /// Take a computer offline or bring it back
    SetOffline { computer: String, offline: bool },

    /// Queued items
    Queue,

    /// One item, queued or recently left
    Item { item: ItemId },

    /// Every executor slot
    Executors,

    /// Daemon status
    Status,

    /// Request daemon shutdown
    Shutdown,
}

/// Response from daemon to CLI
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum Response {
    /// Generic success
    Ok,

    /// Health check response
    Pong,

    /// Version handshake response
    Hello { version: String },

    /// Daemon is shutting down
    ShuttingDown,

    Scheduled {
        item: ItemId,
        /// `false` when merged into an equivalent queued item
        created: bool,
    },

    /// `cancelled` is false when the item was running (and is being aborted)
    /// or unknown
    Cancelled { cancelled: bool },

    Finished {
        item: ItemId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        result: Option<BuildResult>,
        /// Why no result exists (cancelled, scheduler stopped)
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },

    Interrupted { interrupted: bool },

    Queue { items: Vec<QueueItem> },

    Item {
        #[serde(default)]
        queued: Option<QueueItem>,
        #[serde(default)]
        left: Option<LeftItem>,
    },

    Executors { executors: Vec<ExecutorInfo> },

    Status(StatusSummary),

    /// Error response
    Error { message: String },
}

/// Daemon status overview
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusSummary {
    pub version: String,
    pub uptime_secs: u64,
    pub queued: usize,
    pub buildable: usize,
    pub executors_busy: usize,
    pub executors_total: usize,
    pub quieting_down: bool,
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
