// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon client for CLI commands

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::daemon_process::{
    cleanup_stale_pid, cleanup_stale_socket, daemon_dir, daemon_paths, daemon_socket,
    force_kill_daemon, probe_socket, process_exists, read_daemon_pid, read_startup_error,
    start_daemon_background, stop_daemon_sync, wait_for_exit, wrap_with_startup_error,
};

use fm_core::{BuildResult, ItemId, LeftItem, QueueItem};
use fm_daemon::protocol::{self, ProtocolError};
use fm_daemon::{Request, Response, StatusSummary, PROTOCOL_VERSION};
use thiserror::Error;
use tokio::net::UnixStream;

/// Timeout for IPC requests
pub fn timeout_ipc() -> Duration {
    crate::env::timeout_ipc_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for daemon to start
pub fn timeout_connect() -> Duration {
    crate::env::timeout_connect_ms().unwrap_or(Duration::from_secs(5))
}

/// Timeout for waiting for process to exit
pub fn timeout_exit() -> Duration {
    crate::env::timeout_exit_ms().unwrap_or(Duration::from_secs(2))
}

/// Polling interval for connection retries
pub fn poll_interval() -> Duration {
    crate::env::connect_poll_ms().unwrap_or(Duration::from_millis(50))
}

/// Client errors
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    DaemonNotRunning,

    #[error("Failed to start daemon: {0}")]
    DaemonStartFailed(String),

    #[error("Connection timeout waiting for daemon to start")]
    DaemonStartTimeout,

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("{0}")]
    Rejected(String),

    #[error("Unexpected response from daemon")]
    UnexpectedResponse,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

impl ClientError {
    /// Errors that mean nobody is listening on the socket
    pub fn is_not_running(&self) -> bool {
        match self {
            ClientError::DaemonNotRunning => true,
            ClientError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
            ),
            _ => false,
        }
    }
}

/// How a schedule request turned out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scheduled {
    pub item: ItemId,
    pub created: bool,
}

/// Outcome of waiting on an item
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finished {
    Built(BuildResult),
    /// The item never ran (cancelled, or the daemon stopped)
    NotRun(String),
}

/// Daemon client
pub struct DaemonClient {
    socket_path: PathBuf,
}

impl DaemonClient {
    /// For action commands: auto-start with version check, max 1 restart per process
    pub fn for_action() -> Result<Self, ClientError> {
        Self::connect_or_start_once()
    }

    /// For query commands: connect only, no restart
    pub fn for_query() -> Result<Self, ClientError> {
        Self::connect()
    }

    fn connect_or_start_once() -> Result<Self, ClientError> {
        static RESTARTED: AtomicBool = AtomicBool::new(false);

        if RESTARTED.load(Ordering::SeqCst) {
            return Self::connect();
        }
        if let Ok(daemon_version) = std::fs::read_to_string(daemon_paths()?.version_path) {
            if daemon_version.trim() != PROTOCOL_VERSION {
                RESTARTED.store(true, Ordering::SeqCst);
                eprintln!(
                    "warn: daemon version {} does not match cli version {}, restarting daemon",
                    daemon_version.trim(),
                    PROTOCOL_VERSION
                );
                stop_daemon_sync();
            }
        }
        Self::connect_or_start()
    }

    /// Connect to daemon, auto-starting if not running
    pub fn connect_or_start() -> Result<Self, ClientError> {
        match Self::connect() {
            Ok(client) => {
                // A crashed daemon leaves its socket file behind
                if probe_socket(&client.socket_path) {
                    Ok(client)
                } else {
                    cleanup_stale_socket()?;
                    let child = start_daemon_background()?;
                    Self::connect_with_retry(timeout_connect(), child)
                }
            }
            Err(ClientError::DaemonNotRunning) => {
                let child = start_daemon_background()?;
                Self::connect_with_retry(timeout_connect(), child)
            }
            Err(e) => Err(wrap_with_startup_error(e)),
        }
    }

    /// Connect to existing daemon (no auto-start)
    pub fn connect() -> Result<Self, ClientError> {
        let socket_path = daemon_socket()?;
        if !socket_path.exists() {
            return Err(ClientError::DaemonNotRunning);
        }
        Ok(Self { socket_path })
    }

    /// Client for a daemon listening on `socket_path`
    #[cfg(test)]
    pub fn at(socket_path: PathBuf) -> Self {
        Self { socket_path }
    }

    fn connect_with_retry(
        timeout: Duration,
        mut child: std::process::Child,
    ) -> Result<Self, ClientError> {
        let start = Instant::now();
        while start.elapsed() < timeout {
            if let Ok(Some(status)) = child.try_wait() {
                // Startup failed; the log may need a moment to show why
                let poll_start = Instant::now();
                while poll_start.elapsed() < timeout_exit() {
                    if let Some(err) = read_startup_error() {
                        return Err(ClientError::DaemonStartFailed(err));
                    }
                    std::thread::sleep(poll_interval());
                }
                return Err(ClientError::DaemonStartFailed(format!(
                    "exited with {}",
                    status
                )));
            }

            match Self::connect() {
                Ok(client) if probe_socket(&client.socket_path) => return Ok(client),
                Ok(_) | Err(ClientError::DaemonNotRunning) => {
                    std::thread::sleep(poll_interval());
                }
                Err(e) => return Err(wrap_with_startup_error(e)),
            }
        }

        Err(wrap_with_startup_error(ClientError::DaemonStartTimeout))
    }

    /// Send a request; `None` waits for the response indefinitely
    async fn send_with_timeout(
        &self,
        request: &Request,
        read_timeout: Option<Duration>,
    ) -> Result<Response, ClientError> {
        let stream = UnixStream::connect(&self.socket_path).await?;
        let (mut reader, mut writer) = stream.into_split();

        protocol::write_request(&mut writer, request, timeout_ipc()).await?;
        let response = protocol::read_response(&mut reader, read_timeout).await?;
        Ok(response)
    }

    pub async fn send(&self, request: &Request) -> Result<Response, ClientError> {
        self.send_with_timeout(request, Some(timeout_ipc())).await
    }

    /// Send a request expecting `Ok`
    async fn send_simple(&self, request: &Request) -> Result<(), ClientError> {
        match self.send(request).await? {
            Response::Ok => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn status(&self) -> Result<StatusSummary, ClientError> {
        match self.send(&Request::Status).await? {
            Response::Status(summary) => Ok(summary),
            other => Err(unexpected(other)),
        }
    }

    pub async fn shutdown(&self) -> Result<(), ClientError> {
        match self.send(&Request::Shutdown).await? {
            Response::Ok | Response::ShuttingDown => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn schedule(
        &self,
        task: &str,
        quiet_period_secs: Option<u64>,
        parameters: BTreeMap<String, String>,
        user: Option<String>,
    ) -> Result<Scheduled, ClientError> {
        let request = Request::Schedule {
            task: task.to_string(),
            quiet_period_secs,
            parameters,
            user,
        };
        match self.send(&request).await? {
            Response::Scheduled { item, created } => Ok(Scheduled { item, created }),
            other => Err(unexpected(other)),
        }
    }

    /// `false` when the item was running (its build is being aborted) or unknown
    pub async fn cancel(&self, item: ItemId) -> Result<bool, ClientError> {
        match self.send(&Request::Cancel { item }).await? {
            Response::Cancelled { cancelled } => Ok(cancelled),
            other => Err(unexpected(other)),
        }
    }

    /// Block until the item's build finishes. No read timeout: builds run
    /// for as long as they run.
    pub async fn wait(&self, item: ItemId) -> Result<Finished, ClientError> {
        match self.send_with_timeout(&Request::Wait { item }, None).await? {
            Response::Finished {
                result: Some(result),
                ..
            } => Ok(Finished::Built(result)),
            Response::Finished { error, .. } => Ok(Finished::NotRun(
                error.unwrap_or_else(|| "no result".to_string()),
            )),
            other => Err(unexpected(other)),
        }
    }

    pub async fn interrupt(
        &self,
        computer: &str,
        executor: usize,
        result: BuildResult,
        user: Option<String>,
    ) -> Result<bool, ClientError> {
        let request = Request::Interrupt {
            computer: computer.to_string(),
            executor,
            result,
            user,
        };
        match self.send(&request).await? {
            Response::Interrupted { interrupted } => Ok(interrupted),
            other => Err(unexpected(other)),
        }
    }

    pub async fn quiet_down(&self, on: bool) -> Result<(), ClientError> {
        self.send_simple(&Request::QuietDown { on }).await
    }

    pub async fn set_offline(&self, computer: &str, offline: bool) -> Result<(), ClientError> {
        let request = Request::SetOffline {
            computer: computer.to_string(),
            offline,
        };
        self.send_simple(&request).await
    }

    pub async fn queue(&self) -> Result<Vec<QueueItem>, ClientError> {
        match self.send(&Request::Queue).await? {
            Response::Queue { items } => Ok(items),
            other => Err(unexpected(other)),
        }
    }

    pub async fn item(
        &self,
        item: ItemId,
    ) -> Result<(Option<QueueItem>, Option<LeftItem>), ClientError> {
        match self.send(&Request::Item { item }).await? {
            Response::Item { queued, left } => Ok((queued, left)),
            other => Err(unexpected(other)),
        }
    }

    pub async fn executors(&self) -> Result<Vec<fm_daemon::protocol::ExecutorInfo>, ClientError> {
        match self.send(&Request::Executors).await? {
            Response::Executors { executors } => Ok(executors),
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> ClientError {
    match response {
        Response::Error { message } => ClientError::Rejected(message),
        _ => ClientError::UnexpectedResponse,
    }
}

/// Stop the daemon (graceful first, then forceful).
/// Returns true if daemon was stopped, false if it wasn't running.
pub async fn daemon_stop() -> Result<bool, ClientError> {
    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(ClientError::DaemonNotRunning) => {
            if let Ok(dir) = daemon_dir() {
                cleanup_stale_pid(&dir);
            }
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let shutdown_result = client.shutdown().await;

    if let Some(pid) = read_daemon_pid()? {
        if shutdown_result.is_ok() {
            // Builds get their grace period before the daemon exits
            wait_for_exit(pid, timeout_exit() + shutdown_allowance()).await;
        }
        if process_exists(pid) {
            force_kill_daemon(pid);
            wait_for_exit(pid, timeout_exit()).await;
        }
    } else if let Err(e) = shutdown_result {
        if e.is_not_running() {
            return Ok(false);
        }
        return Err(e);
    }

    if let Ok(dir) = daemon_dir() {
        cleanup_stale_pid(&dir);
    }
    Ok(true)
}

/// Extra time for a graceful shutdown: the default grace period plus the
/// daemon's final save.
fn shutdown_allowance() -> Duration {
    Duration::from_secs(15)
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
