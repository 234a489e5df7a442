// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fm daemon` - Daemon management commands

use anyhow::{anyhow, Result};
use clap::{Args, Subcommand};
use std::process::Command;

use crate::client::{daemon_stop, DaemonClient};
use crate::daemon_process::{daemon_paths, find_fmd_binary};
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    #[command(subcommand)]
    pub command: DaemonCommand,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (background unless --foreground)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon; running builds get the shutdown grace period
    Stop,
    /// Stop and restart the daemon
    Restart,
    /// Check daemon status
    Status,
    /// View daemon logs
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    match args.command {
        DaemonCommand::Start { foreground } => start(foreground).await,
        DaemonCommand::Stop => stop().await,
        DaemonCommand::Restart => restart().await,
        DaemonCommand::Status => status(format).await,
        DaemonCommand::Logs { limit } => logs(limit, format),
    }
}

async fn start(foreground: bool) -> Result<()> {
    if foreground {
        let status = Command::new(find_fmd_binary()).status()?;
        if !status.success() {
            return Err(anyhow!("Daemon exited with status: {}", status));
        }
        return Ok(());
    }

    if let Ok(client) = DaemonClient::connect() {
        if let Ok(summary) = client.status().await {
            println!(
                "Daemon already running (uptime: {})",
                format_uptime(summary.uptime_secs)
            );
            return Ok(());
        }
    }

    DaemonClient::connect_or_start()?;
    println!("Daemon started");
    Ok(())
}

async fn stop() -> Result<()> {
    match daemon_stop().await {
        Ok(true) => println!("Daemon stopped"),
        Ok(false) => println!("Daemon not running"),
        Err(e) => return Err(anyhow!("Failed to stop daemon: {}", e)),
    }
    Ok(())
}

async fn restart() -> Result<()> {
    let was_running = daemon_stop()
        .await
        .map_err(|e| anyhow!("Failed to stop daemon: {}", e))?;
    if was_running {
        // Let the OS release the socket
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }
    DaemonClient::connect_or_start()?;
    println!("Daemon restarted");
    Ok(())
}

async fn status(format: OutputFormat) -> Result<()> {
    let not_running = || match format {
        OutputFormat::Text => {
            println!("Daemon not running");
            Ok(())
        }
        OutputFormat::Json => print_json(&serde_json::json!({ "status": "not_running" })),
    };

    let client = match DaemonClient::connect() {
        Ok(c) => c,
        Err(_) => return not_running(),
    };
    let summary = match client.status().await {
        Ok(summary) => summary,
        Err(e) if e.is_not_running() => return not_running(),
        Err(e) => return Err(e.into()),
    };

    match format {
        OutputFormat::Text => {
            println!("Status: running");
            println!("Version: {}", summary.version);
            println!("Uptime: {}", format_uptime(summary.uptime_secs));
            println!(
                "Queue: {} item(s), {} buildable",
                summary.queued, summary.buildable
            );
            println!(
                "Executors: {}/{} busy",
                summary.executors_busy, summary.executors_total
            );
            if summary.quieting_down {
                println!("{}", crate::color::status("quieting down: no new builds start"));
            }
        }
        OutputFormat::Json => print_json(&serde_json::json!({
            "status": "running",
            "version": summary.version,
            "uptime_secs": summary.uptime_secs,
            "uptime": format_uptime(summary.uptime_secs),
            "queued": summary.queued,
            "buildable": summary.buildable,
            "executors_busy": summary.executors_busy,
            "executors_total": summary.executors_total,
            "quieting_down": summary.quieting_down,
        }))?,
    }
    Ok(())
}

fn logs(limit: usize, format: OutputFormat) -> Result<()> {
    let log_path = daemon_paths()?.log_path;
    let content = if log_path.exists() {
        read_last_lines(&std::fs::read_to_string(&log_path)?, limit)
    } else {
        String::new()
    };

    match format {
        OutputFormat::Text if content.is_empty() => {
            println!("No log entries at {}", log_path.display())
        }
        OutputFormat::Text => println!("{}", content),
        OutputFormat::Json => print_json(&serde_json::json!({
            "log_path": log_path.to_string_lossy(),
            "lines": content.lines().collect::<Vec<_>>(),
        }))?,
    }
    Ok(())
}

fn read_last_lines(content: &str, n: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

fn format_uptime(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, mins, secs)
    } else if mins > 0 {
        format!("{}m {}s", mins, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
