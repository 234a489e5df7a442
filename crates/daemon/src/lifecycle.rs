// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup, shutdown, recovery.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use fm_core::SystemClock;
use fm_engine::{Runtime, RuntimeError, SaverDelay, SnapshotStore};
use fm_storage::{load_snapshot, Checkpointer, SnapshotError};
use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::config::{ConfigError, Definitions};
use crate::env;
use crate::protocol::PROTOCOL_VERSION;

/// The scheduler as the daemon runs it
pub type DaemonRuntime = Runtime<SystemClock>;

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/fm)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to version file
    pub version_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Path to the queue snapshot
    pub snapshot_path: PathBuf,
    /// Task and node definitions
    pub definitions_path: PathBuf,
    /// Per-build log files
    pub logs_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon.
    pub fn load() -> Result<Self, LifecycleError> {
        let mut config = Self::for_state_dir(env::state_dir()?);
        if let Some(path) = env::config_path() {
            config.definitions_path = path;
        }
        Ok(config)
    }

    /// Paths under `state_dir`
    pub fn for_state_dir(state_dir: PathBuf) -> Self {
        Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            version_path: state_dir.join("daemon.version"),
            log_path: state_dir.join("daemon.log"),
            snapshot_path: state_dir.join("queue.zst"),
            definitions_path: state_dir.join("foreman.toml"),
            logs_path: state_dir.join("logs"),
            state_dir,
        }
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Definitions error: {0}")]
    Config(#[from] ConfigError),

    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub runtime: Arc<DaemonRuntime>,
    pub start_time: Instant,
    shutdown_grace: Duration,
}

/// Result of daemon startup - the daemon state and the socket to serve.
pub struct StartupResult {
    pub daemon: DaemonState,
    pub listener: UnixListener,
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config).await {
        Ok(result) => Ok(result),
        Err(e) => {
            // Lock files of a running daemon are not ours to remove
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Lock before touching anything else. Open without truncating so a
    // running daemon's PID survives a failed attempt.
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    std::fs::create_dir_all(&config.logs_path)?;
    std::fs::write(&config.version_path, PROTOCOL_VERSION)?;

    let definitions = Definitions::load(&config.definitions_path)?;
    info!(
        tasks = definitions.tasks.len(),
        nodes = definitions.nodes.len(),
        path = %config.definitions_path.display(),
        "loaded definitions"
    );
    let registry = definitions.registry(&config.logs_path)?;

    let mut runtime_config = definitions.runtime_config();
    if let Some(secs) = env::saver_delay_secs() {
        runtime_config.saver_delay = SaverDelay::from_secs(secs);
    }
    if let Some(interval) = env::maintain_interval() {
        runtime_config.maintain_interval = interval;
    }

    let store: Arc<dyn SnapshotStore> = Arc::new(Checkpointer::new(config.snapshot_path.clone()));
    let runtime = Runtime::new(registry, SystemClock, runtime_config, Some(store));

    restore_queue(&runtime, &config.snapshot_path)?;
    runtime.start()?;
    for spec in definitions.computers() {
        runtime.add_computer(spec)?;
    }

    // Bind last, once everything else is in place
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            runtime: Arc::new(runtime),
            start_time: Instant::now(),
            shutdown_grace: definitions.shutdown_grace(),
        },
        listener,
    })
}

/// Load the last saved queue. Items of tasks that no longer exist are dropped.
fn restore_queue(runtime: &DaemonRuntime, path: &Path) -> Result<(), LifecycleError> {
    match load_snapshot(path)? {
        Some(snapshot) => {
            let saved = snapshot.items.len();
            let restored = runtime.restore(snapshot);
            info!(restored, dropped = saved - restored, "restored queue");
        }
        None => info!("no saved queue, starting empty"),
    }
    Ok(())
}

/// Remove files a failed startup may have left behind.
fn cleanup_on_failure(config: &Config) {
    for path in [&config.socket_path, &config.version_path, &config.lock_path] {
        if path.exists() {
            if let Err(e) = std::fs::remove_file(path) {
                warn!(path = %path.display(), error = %e, "cleanup failed");
            }
        }
    }
}

impl DaemonState {
    /// Shutdown the daemon gracefully.
    ///
    /// Running builds get the configured grace period, then are aborted. The
    /// queue is saved before the socket and PID files are removed.
    pub async fn shutdown(&mut self) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");
        self.runtime.shutdown(self.shutdown_grace).await;

        for path in [
            &self.config.socket_path,
            &self.config.lock_path,
            &self.config.version_path,
        ] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!(path = %path.display(), error = %e, "failed to remove file");
                }
            }
        }

        // Lock file is released when self.lock_file is dropped
        info!("Daemon shutdown complete");
        Ok(())
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
