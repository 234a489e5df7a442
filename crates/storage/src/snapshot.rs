// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Persisted queue snapshot.
//!
//! A snapshot holds every item that was still queued (waiting, blocked or
//! buildable) when it was taken, plus the next item id so that ids keep
//! increasing across restarts. Items that already left the queue are never
//! written.

use crate::migration::{MigrationError, MigrationRegistry};
use crate::CURRENT_SNAPSHOT_VERSION;
use chrono::{DateTime, Utc};
use fm_core::{Action, Cause, ItemId, Stage, TaskId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

/// Errors that can occur in snapshot operations
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
}

/// One queued item as written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub id: ItemId,
    pub task: TaskId,
    pub submitted_at_ms: u64,
    pub due_at_ms: u64,
    pub stage: Stage,
    #[serde(default)]
    pub causes: Vec<Cause>,
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// The queue at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Schema version
    pub v: u32,
    /// Id the next scheduled item receives
    pub next_id: u64,
    pub items: Vec<ItemRecord>,
    /// When this snapshot was created
    pub created_at: DateTime<Utc>,
}

impl QueueSnapshot {
    pub fn new(next_id: u64, items: Vec<ItemRecord>) -> Self {
        Self {
            v: CURRENT_SNAPSHOT_VERSION,
            next_id,
            items,
            created_at: Utc::now(),
        }
    }
}

/// Load a zstd-compressed snapshot.
///
/// Returns `Ok(None)` if the file doesn't exist or is corrupt. Corrupt
/// snapshots are moved to a `.bak` file and the queue starts empty.
pub fn load_snapshot(path: &Path) -> Result<Option<QueueSnapshot>, SnapshotError> {
    if !path.exists() {
        return Ok(None);
    }

    let value = match read_value(path) {
        Ok(value) => value,
        Err(e) => {
            let bak_path = rotate_bak_path(path);
            warn!(
                error = %e,
                path = %path.display(),
                bak = %bak_path.display(),
                "Corrupt snapshot, moving to .bak and starting fresh",
            );
            fs::rename(path, &bak_path)?;
            return Ok(None);
        }
    };

    let registry = MigrationRegistry::new();
    let migrated = registry.migrate_to(value, CURRENT_SNAPSHOT_VERSION)?;
    let snapshot: QueueSnapshot = serde_json::from_value(migrated)?;
    Ok(Some(snapshot))
}

fn read_value(path: &Path) -> Result<Value, SnapshotError> {
    let file = File::open(path)?;
    let decoder = zstd::stream::read::Decoder::new(file)?;
    Ok(serde_json::from_reader(decoder)?)
}

const MAX_BAK_FILES: u32 = 3;

/// Pick the next `.bak` / `.bak.N` path, rotating older backups out.
///
/// Keeps up to [`MAX_BAK_FILES`] backups: `.bak`, `.bak.2`, `.bak.3`.
pub(crate) fn rotate_bak_path(path: &Path) -> PathBuf {
    let bak = |n: u32| {
        if n == 1 {
            path.with_extension("bak")
        } else {
            path.with_extension(format!("bak.{n}"))
        }
    };

    let oldest = bak(MAX_BAK_FILES);
    if oldest.exists() {
        let _ = fs::remove_file(&oldest);
    }

    for n in (1..MAX_BAK_FILES).rev() {
        let src = bak(n);
        if src.exists() {
            let _ = fs::rename(&src, bak(n + 1));
        }
    }

    bak(1)
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
