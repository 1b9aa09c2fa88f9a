// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dbsrv daemon` - Daemon management commands

use std::process::Command;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use dbsrv_daemon::StopMode;

use super::ShutdownArgs;
use crate::client::DaemonClient;
use crate::daemon_process::{daemon_binary, DaemonFiles};
use crate::env::Timeouts;
use crate::output::{display_log, OutputFormat};

#[derive(Args)]
pub struct DaemonArgs {
    /// Print daemon version
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<DaemonCommand>,
}

#[derive(Subcommand)]
pub enum DaemonCommand {
    /// Start the daemon (foreground or background)
    Start {
        /// Run in foreground (useful for debugging)
        #[arg(long)]
        foreground: bool,
    },
    /// Stop the daemon
    Stop(ShutdownArgs),
    /// Check daemon status
    Status,
    /// Stop and restart the daemon
    Restart(ShutdownArgs),
    /// View daemon logs
    Logs {
        /// Number of recent lines to show
        #[arg(short = 'n', long, default_value = "50")]
        limit: usize,
        /// Show all lines (no limit)
        #[arg(long, conflicts_with = "limit")]
        no_limit: bool,
    },
}

pub async fn daemon(args: DaemonArgs, format: OutputFormat) -> Result<()> {
    if args.version {
        return version(format).await;
    }
    match args.command {
        Some(DaemonCommand::Start { foreground: true }) => run_foreground(),
        Some(DaemonCommand::Start { foreground: false }) => start().await,
        Some(DaemonCommand::Stop(shutdown)) => stop(shutdown.mode()).await,
        Some(DaemonCommand::Restart(shutdown)) => restart(shutdown.mode()).await,
        Some(DaemonCommand::Status) => status(format).await,
        Some(DaemonCommand::Logs { limit, no_limit }) => logs((!no_limit).then_some(limit), format),
        None => {
            if let Some(cmd) = crate::cli_command().find_subcommand_mut("daemon") {
                cmd.print_help()?;
            }
            Ok(())
        }
    }
}

fn not_running(format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => println!("Daemon not running"),
        OutputFormat::Json => println!("{}", serde_json::json!({ "status": "not_running" })),
    }
    Ok(())
}

/// A client for a daemon that answers a ping, if there is one.
async fn running() -> Option<DaemonClient> {
    let client = DaemonClient::connect().ok()?;
    client.ping().await.ok()?;
    Some(client)
}

async fn version(format: OutputFormat) -> Result<()> {
    let Some(client) = running().await else {
        return not_running(format);
    };
    let version = client.version().await?;
    match format {
        OutputFormat::Text => println!("dbsrvd {version}"),
        OutputFormat::Json => println!("{}", serde_json::json!({ "version": version })),
    }
    Ok(())
}

fn run_foreground() -> Result<()> {
    let binary = daemon_binary();
    let status = Command::new(&binary)
        .status()
        .with_context(|| format!("could not run {}", binary.display()))?;
    if !status.success() {
        bail!("dbsrvd exited with {status}");
    }
    Ok(())
}

async fn start() -> Result<()> {
    if running().await.is_some() {
        println!("Daemon already running");
        return Ok(());
    }
    DaemonClient::connect_or_start().await?;
    println!("Daemon started");
    Ok(())
}

/// Stop whatever daemon owns the state directory. Returns whether one ran.
async fn stop_daemon(mode: StopMode) -> Result<bool> {
    let client = DaemonClient::attach(DaemonFiles::locate()?, Timeouts::from_env());
    client.stop(mode).await.context("Failed to stop daemon")
}

async fn stop(mode: StopMode) -> Result<()> {
    if stop_daemon(mode).await? {
        println!("Daemon stopped");
    } else {
        println!("Daemon not running");
    }
    Ok(())
}

async fn restart(mode: StopMode) -> Result<()> {
    stop_daemon(mode).await?;
    DaemonClient::connect_or_start().await?;
    println!("Daemon restarted");
    Ok(())
}

async fn status(format: OutputFormat) -> Result<()> {
    let Some(client) = running().await else {
        return not_running(format);
    };
    let version = client.version().await?;
    let server = client.console("DISPLAY SERVER STATUS").await?;

    match format {
        OutputFormat::Text => {
            println!("Status: running");
            println!("Version: {version}");
            for line in &server {
                println!("{line}");
            }
        }
        OutputFormat::Json => {
            let obj = serde_json::json!({
                "status": "running",
                "version": version,
                "server": server,
            });
            println!("{}", serde_json::to_string_pretty(&obj)?);
        }
    }
    Ok(())
}

fn logs(limit: Option<usize>, format: OutputFormat) -> Result<()> {
    let log_path = DaemonFiles::locate()?.log();
    let content = match std::fs::read_to_string(&log_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            match format {
                OutputFormat::Text => println!("No log file found at {}", log_path.display()),
                OutputFormat::Json => println!(
                    "{}",
                    serde_json::json!({ "log_path": log_path.to_string_lossy(), "lines": [] })
                ),
            }
            return Ok(());
        }
        Err(e) => return Err(e).with_context(|| format!("could not read {}", log_path.display())),
    };
    let content = match limit {
        Some(n) => last_lines(&content, n),
        None => content,
    };
    display_log(&log_path, &content, format)
}

fn last_lines(content: &str, n: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines.get(start..).unwrap_or_default().join("\n")
}

#[cfg(test)]
#[path = "daemon_tests.rs"]
mod tests;
