// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `fm queue` and `fm item`

use anyhow::{anyhow, Result};
use clap::Args;
use fm_core::{parameters_of, ItemId, LeftItem, LeftOutcome, QueueItem, Stage};

use crate::client::DaemonClient;
use crate::color;
use crate::output::{format_due, format_parameters, format_time_ago, now_ms, print_json, OutputFormat};
use crate::table::{Column, Table};

#[derive(Args)]
pub struct ItemArgs {
    /// Item id
    pub item: ItemId,
}

pub async fn list(client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let items = client.queue().await?;
    match format {
        OutputFormat::Json => print_json(&items),
        OutputFormat::Text if items.is_empty() => {
            println!("Queue is empty");
            Ok(())
        }
        OutputFormat::Text => {
            queue_table(&items, now_ms()).render(&mut std::io::stdout());
            Ok(())
        }
    }
}

/// One row per item, oldest first
pub fn queue_table(items: &[QueueItem], now_ms: u64) -> Table {
    let mut table = Table::new(vec![
        Column::right("ID"),
        Column::left("TASK"),
        Column::status("STAGE"),
        Column::muted("AGE"),
        Column::left("DUE"),
        Column::left("PARAMS").with_max(40),
        Column::muted("WHY"),
    ]);
    for item in items {
        table.row(queue_row(item, now_ms));
    }
    table
}

fn queue_row(item: &QueueItem, now_ms: u64) -> Vec<String> {
    let due = match item.stage {
        Stage::Waiting => format_due(item.due_at_ms, now_ms),
        Stage::Blocked | Stage::Buildable => "-".to_string(),
    };
    vec![
        item.id.to_string(),
        item.task.to_string(),
        item.stage.to_string(),
        format_time_ago(item.submitted_at_ms, now_ms),
        due,
        format_parameters(&parameters_of(&item.actions)),
        item.why().unwrap_or_default(),
    ]
}

pub async fn show(args: ItemArgs, client: &DaemonClient, format: OutputFormat) -> Result<()> {
    let (queued, left) = client.item(args.item).await?;
    if queued.is_none() && left.is_none() {
        return Err(anyhow!("item {} is not queued and did not leave recently", args.item));
    }
    match format {
        OutputFormat::Json => print_json(&serde_json::json!({
            "queued": queued,
            "left": left,
        })),
        OutputFormat::Text => {
            let lines = match (&queued, &left) {
                (Some(item), _) => queued_lines(item, now_ms()),
                (None, Some(left)) => left_lines(left, now_ms()),
                (None, None) => Vec::new(),
            };
            for line in lines {
                println!("{line}");
            }
            Ok(())
        }
    }
}

pub fn queued_lines(item: &QueueItem, now_ms: u64) -> Vec<String> {
    let mut lines = vec![
        format!("{} {}", color::header("Item:"), item.id),
        format!("{} {}", color::header("Task:"), item.task),
        format!("{} {}", color::header("Stage:"), color::status(&item.stage.to_string())),
        format!(
            "{} {} ago",
            color::header("Submitted:"),
            format_time_ago(item.submitted_at_ms, now_ms)
        ),
    ];
    if item.stage == Stage::Waiting {
        lines.push(format!(
            "{} {}",
            color::header("Due:"),
            format_due(item.due_at_ms, now_ms)
        ));
    }
    if let Some(why) = item.why() {
        lines.push(format!("{} {}", color::header("Why:"), why));
    }
    let params = parameters_of(&item.actions);
    if !params.is_empty() {
        lines.push(format!("{} {}", color::header("Parameters:"), format_parameters(&params)));
    }
    for cause in &item.causes {
        lines.push(format!("  {}", color::context(&cause.to_string())));
    }
    lines
}

pub fn left_lines(left: &LeftItem, now_ms: u64) -> Vec<String> {
    let outcome = match &left.outcome {
        LeftOutcome::Started { computer, executor } => {
            format!("started on {} executor {}", computer, executor)
        }
        LeftOutcome::Cancelled => "cancelled".to_string(),
    };
    let mut lines = vec![
        format!("{} {}", color::header("Item:"), left.id),
        format!("{} {}", color::header("Task:"), left.task),
        format!(
            "{} {} ({} ago)",
            color::header("Left:"),
            color::status(&outcome),
            format_time_ago(left.left_at_ms, now_ms)
        ),
    ];
    if let Some(result) = left.result {
        lines.push(format!(
            "{} {}",
            color::header("Result:"),
            color::status(result.as_str())
        ));
    }
    for cause in &left.causes {
        lines.push(format!("  {}", color::context(&cause.to_string())));
    }
    lines
}

#[cfg(test)]
#[path = "queue_tests.rs"]
mod tests;
