// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fm schedule` and `fm cancel`

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use fm_core::{BuildResult, ItemId};

use crate::client::{DaemonClient, Finished};
use crate::exit_error::ExitError;
use crate::output::{print_json, OutputFormat};

#[derive(Args)]
pub struct ScheduleArgs {
    /// Task to schedule
    pub task: String,

    /// Quiet period in seconds (overrides the task's own)
    #[arg(short = 'q', long = "quiet-period")]
    pub quiet_period: Option<u64>,

    /// Build parameter as key=value (repeatable)
    #[arg(short = 'p', long = "param", value_parser = parse_param)]
    pub params: Vec<(String, String)>,

    /// Wait for the build to finish; the exit code reflects its result
    #[arg(long)]
    pub wait: bool,
}

#[derive(Args)]
pub struct CancelArgs {
    /// Item id
    pub item: ItemId,
}

/// Parse a `key=value` build parameter
pub fn parse_param(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

/// Exit code for `--wait`
pub fn exit_code(finished: &Finished) -> i32 {
    match finished {
        Finished::Built(BuildResult::Success) => 0,
        Finished::Built(BuildResult::Failure) => 1,
        Finished::Built(BuildResult::Unstable) => 2,
        Finished::Built(BuildResult::Aborted) => 3,
        Finished::Built(BuildResult::NotBuilt) => 4,
        Finished::NotRun(_) => 5,
    }
}

pub async fn schedule(args: ScheduleArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let parameters: BTreeMap<String, String> = args.params.into_iter().collect();
    let scheduled = client
        .schedule(&args.task, args.quiet_period, parameters, crate::env::user())
        .await?;

    match format {
        OutputFormat::Text if scheduled.created => {
            println!("Scheduled {} as item {}", args.task, scheduled.item)
        }
        OutputFormat::Text => println!(
            "Merged into queued item {} of {}",
            scheduled.item, args.task
        ),
        OutputFormat::Json if !args.wait => print_json(&serde_json::json!({
            "item": scheduled.item,
            "created": scheduled.created,
        }))?,
        OutputFormat::Json => {}
    }

    if !args.wait {
        return Ok(());
    }

    let finished = client.wait(scheduled.item).await?;
    match (&finished, format) {
        (Finished::Built(result), OutputFormat::Text) => {
            println!("Item {} finished: {}", scheduled.item, crate::color::status(result.as_str()))
        }
        (Finished::NotRun(reason), OutputFormat::Text) => {
            println!("Item {} did not run: {}", scheduled.item, reason)
        }
        (Finished::Built(result), OutputFormat::Json) => print_json(&serde_json::json!({
            "item": scheduled.item,
            "created": scheduled.created,
            "result": result,
        }))?,
        (Finished::NotRun(reason), OutputFormat::Json) => print_json(&serde_json::json!({
            "item": scheduled.item,
            "created": scheduled.created,
            "error": reason,
        }))?,
    }

    match exit_code(&finished) {
        0 => Ok(()),
        code => Err(ExitError::new(code, String::new()).into()),
    }
}

pub async fn cancel(args: CancelArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let cancelled = client.cancel(args.item).await?;
    match format {
        OutputFormat::Text if cancelled => println!("Cancelled item {}", args.item),
        OutputFormat::Text => println!(
            "Item {} is not queued (a running build is aborted)",
            args.item
        ),
        OutputFormat::Json => print_json(&serde_json::json!({
            "item": args.item,
            "cancelled": cancelled,
        }))?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
