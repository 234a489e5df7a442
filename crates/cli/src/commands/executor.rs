// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fm executors`, `fm interrupt`, `fm quiet-down`, `fm offline` / `fm online`

use anyhow::Result;
use clap::Args;
use fm_core::BuildResult;
use fm_daemon::protocol::ExecutorInfo;

use crate::client::DaemonClient;
use crate::output::{format_time_ago, now_ms, print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct InterruptArgs {
    /// Computer name
    pub computer: String,
    /// Executor number on that computer
    pub executor: usize,
    /// Result recorded for the interrupted build
    #[arg(long, default_value = "ABORTED")]
    pub result: BuildResult,
}

#[derive(Args)]
pub struct QuietDownArgs {
    /// Resume starting builds
    #[arg(long)]
    pub off: bool,
}

#[derive(Args)]
pub struct ComputerArgs {
    /// Computer name
    pub computer: String,
}

pub async fn list(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let executors = client.executors().await?;
    match format {
        OutputFormat::Json => print_json(&executors),
        OutputFormat::Text if executors.is_empty() => {
            println!("No executors");
            Ok(())
        }
        OutputFormat::Text => {
            executor_table(&executors, now_ms()).render(&mut std::io::stdout());
            Ok(())
        }
    }
}

pub fn executor_table(executors: &[ExecutorInfo], now_ms: u64) -> Table {
    let mut table = Table::new(vec![
        Column::left("COMPUTER"),
        Column::right("#"),
        Column::status("STATE"),
        Column::left("ITEM"),
        Column::left("TASK"),
        Column::muted("SINCE"),
    ]);
    for info in executors {
        table.row(executor_row(info, now_ms));
    }
    table
}

fn executor_row(info: &ExecutorInfo, now_ms: u64) -> Vec<String> {
    let (state, item, task, since) = match &info.current {
        Some(build) => {
            let state = match &info.interruption {
                Some(interruption) => format!("interrupted ({})", interruption.result),
                None => "running".to_string(),
            };
            (
                state,
                build.item.to_string(),
                build.task.to_string(),
                format_time_ago(build.started_at_ms, now_ms),
            )
        }
        None => (
            "idle".to_string(),
            "-".to_string(),
            "-".to_string(),
            info.idle_since_ms
                .map(|ms| format_time_ago(ms, now_ms))
                .unwrap_or_else(|| "-".to_string()),
        ),
    };
    vec![
        info.computer.to_string(),
        info.number.to_string(),
        state,
        item,
        task,
        since,
    ]
}

pub async fn interrupt(args: InterruptArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let interrupted = client
        .interrupt(&args.computer, args.executor, args.result, crate::env::user())
        .await?;
    match format {
        OutputFormat::Text if interrupted => println!(
            "Interrupted {} executor {} ({})",
            args.computer, args.executor, args.result
        ),
        OutputFormat::Text => println!(
            "{} executor {} is idle",
            args.computer, args.executor
        ),
        OutputFormat::Json => print_json(&serde_json::json!({
            "computer": args.computer,
            "executor": args.executor,
            "interrupted": interrupted,
        }))?,
    }
    Ok(())
}

pub async fn quiet_down(args: QuietDownArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let on = !args.off;
    client.quiet_down(on).await?;
    match format {
        OutputFormat::Text if on => println!("Quieting down: no new builds start"),
        OutputFormat::Text => println!("Quiet down cancelled: builds start again"),
        OutputFormat::Json => print_json(&serde_json::json!({ "quieting_down": on }))?,
    }
    Ok(())
}

pub async fn set_offline(
    args: ComputerArgs,
    offline: bool,
    client: &DaemonClient,
    format: OutputFormat,
) -> Result<()> {
    client.set_offline(&args.computer, offline).await?;
    let state = if offline { "offline" } else { "online" };
    match format {
        OutputFormat::Text => println!("{} is {}", args.computer, crate::color::status(state)),
        OutputFormat::Json => print_json(&serde_json::json!({
            "computer": args.computer,
            "offline": offline,
        }))?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
