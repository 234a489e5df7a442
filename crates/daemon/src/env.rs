// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: FM_STATE_DIR > XDG_STATE_HOME/fm > ~/.local/state/fm
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("FM_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("fm"));
    }
    let home = std::env::var("HOME").map_err(|_| LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/fm"))
}

/// Task and node definitions file override
pub fn config_path() -> Option<PathBuf> {
    std::env::var("FM_CONFIG").ok().map(PathBuf::from)
}

/// Saver delay override in seconds; negative disables saving
pub fn saver_delay_secs() -> Option<i64> {
    std::env::var("FM_SAVER_DELAY_SECS")
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
}

/// Maintenance interval override
pub fn maintain_interval() -> Option<Duration> {
    std::env::var("FM_MAINTAIN_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}
