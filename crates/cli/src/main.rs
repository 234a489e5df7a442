// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! fm - Foreman CLI

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod color;
mod commands;
mod daemon_process;
mod env;
mod exit_error;
mod output;
mod table;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use commands::{daemon, executor, queue, schedule};
use output::OutputFormat;

use crate::client::DaemonClient;

#[derive(Parser)]
#[command(
    name = "fm",
    version,
    about = "Foreman - build queue and executors",
    styles = color::styles()
)]
struct Cli {
    /// Output format
    #[arg(
        short = 'o',
        long = "output",
        value_enum,
        default_value_t,
        global = true
    )]
    output: OutputFormat,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Put a task in the queue
    Schedule(schedule::ScheduleArgs),
    /// Cancel a queued item
    Cancel(schedule::CancelArgs),
    /// List queued items
    Queue,
    /// Show one item, queued or recently left
    Item(queue::ItemArgs),
    /// List executors and what they are building
    Executors,
    /// Interrupt the build on an executor
    Interrupt(executor::InterruptArgs),
    /// Stop starting new builds (or resume with --off)
    QuietDown(executor::QuietDownArgs),
    /// Take a computer offline, aborting its builds
    Offline(executor::ComputerArgs),
    /// Bring a computer back online
    Online(executor::ComputerArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let code = e
            .downcast_ref::<exit_error::ExitError>()
            .map_or(1, |c| c.code);
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(code);
    }
}

/// Format an anyhow error, skipping the source chain when the top-level
/// message already contains it.
fn format_error(err: &anyhow::Error) -> String {
    let top = err.to_string();

    let chain_redundant = err
        .chain()
        .skip(1)
        .all(|cause| top.contains(&cause.to_string()));
    if chain_redundant {
        return top;
    }

    let mut buf = top;
    for (i, cause) in err.chain().skip(1).enumerate() {
        buf.push_str(&format!("\n\nCaused by:\n    {}: {}", i, cause));
    }
    buf
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let format = cli.output;

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    // Mutations start the daemon if needed; queries only connect
    match command {
        Commands::Daemon(args) => daemon::daemon(args, format).await?,
        Commands::Schedule(args) => {
            let client = DaemonClient::for_action()?;
            schedule::schedule(args, &client, format).await?
        }
        Commands::Cancel(args) => {
            let client = DaemonClient::for_action()?;
            schedule::cancel(args, &client, format).await?
        }
        Commands::Interrupt(args) => {
            let client = DaemonClient::for_action()?;
            executor::interrupt(args, &client, format).await?
        }
        Commands::QuietDown(args) => {
            let client = DaemonClient::for_action()?;
            executor::quiet_down(args, &client, format).await?
        }
        Commands::Offline(args) => {
            let client = DaemonClient::for_action()?;
            executor::set_offline(args, true, &client, format).await?
        }
        Commands::Online(args) => {
            let client = DaemonClient::for_action()?;
            executor::set_offline(args, false, &client, format).await?
        }
        Commands::Queue => {
            let client = DaemonClient::for_query()?;
            queue::list(&client, format).await?
        }
        Commands::Item(args) => {
            let client = DaemonClient::for_query()?;
            queue::show(args, &client, format).await?
        }
        Commands::Executors => {
            let client = DaemonClient::for_query()?;
            executor::list(&client, format).await?
        }
    }

    Ok(())
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
