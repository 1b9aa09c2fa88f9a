// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dbsrv - operator CLI for the database server daemon

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod client;
mod commands;
mod daemon_process;
mod env;
mod output;

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use commands::{console, daemon, ShutdownArgs};
use output::OutputFormat;

use crate::client::DaemonClient;

#[derive(Parser)]
#[command(name = "dbsrv", version, about = "Database server operator console")]
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
    /// Run an operator console command (DISPLAY, SET, CLEAR, HELP)
    Console(console::ConsoleArgs),
    /// Check that the daemon answers
    Ping,
    /// Shut the server down
    Shutdown(ShutdownArgs),
    /// Daemon management
    Daemon(daemon::DaemonArgs),
}

/// The clap command tree, for printing help.
pub(crate) fn cli_command() -> clap::Command {
    Cli::command()
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        let msg = format_error(&e);
        if !msg.is_empty() {
            eprintln!("Error: {}", msg);
        }
        std::process::exit(1);
    }
}

/// Format an anyhow error, deduplicating the chain.
///
/// If the top-level Display already contains every source message the
/// "Caused by" chain is skipped.
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
        cli_command().print_help()?;
        println!();
        return Ok(());
    };

    match command {
        Commands::Console(args) => console::console(args, format).await,
        Commands::Daemon(args) => daemon::daemon(args, format).await,
        Commands::Ping => {
            DaemonClient::connect()?.ping().await?;
            println!("pong");
            Ok(())
        }
        Commands::Shutdown(args) => {
            let mode = DaemonClient::connect()?.shutdown(args.mode()).await?;
            println!("Shutdown requested ({mode})");
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
