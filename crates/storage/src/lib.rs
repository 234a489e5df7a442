// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Storage layer for Foreman: the persisted queue snapshot

mod checkpoint;
mod migration;
mod snapshot;

pub use checkpoint::{
    CheckpointError, CheckpointResult, Checkpointer, CheckpointWriter, FsCheckpointWriter,
};
pub use migration::{Migration, MigrationError, MigrationRegistry};
pub use snapshot::{load_snapshot, ItemRecord, QueueSnapshot, SnapshotError};

/// Schema version written by this build
pub const CURRENT_SNAPSHOT_VERSION: u32 = 2;
