// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Database server control-plane daemon (dbsrvd)
//!
//! Architecture:
//! - Listener task: socket I/O, one console command per connection
//! - Lead-item cache task: periodic directory refresh
//! - Main task: waits for a shutdown request or signal

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use dbsrv_core::ShutdownState;
use dbsrv_daemon::lifecycle::{self, Config, LifecycleError, StartupResult};
use dbsrv_daemon::listener::Listener;
use dbsrv_daemon::PROTOCOL_VERSION;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Notify;
use tracing::{error, info, warn};

/// How long shutdown waits for the cache task to observe its stop flag.
const CACHE_STOP_TIMEOUT: Duration = Duration::from_secs(2);

const HELP: &str = "\
Database server control plane: worker registry, operator console and
lead-item cache.

USAGE:
    dbsrvd [--help | --version]

Normally started by `dbsrv`, which talks to it over daemon.sock in the
state directory (DBSRV_STATE_DIR). Logging follows RUST_LOG.
";

/// What the command line asks for.
#[derive(Debug, PartialEq, Eq)]
enum Invocation {
    Serve,
    Version,
    Help,
    Unexpected(String),
}

fn invocation(mut args: impl Iterator<Item = String>) -> Invocation {
    match args.next().as_deref() {
        None => Invocation::Serve,
        Some("--version" | "-V" | "-v") => Invocation::Version,
        Some("--help" | "-h" | "help") => Invocation::Help,
        Some(other) => Invocation::Unexpected(other.to_string()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Answered before the lock or config are touched.
    match invocation(std::env::args().skip(1)) {
        Invocation::Serve => {}
        Invocation::Version => {
            println!("dbsrvd {PROTOCOL_VERSION}");
            return Ok(());
        }
        Invocation::Help => {
            print!("dbsrvd {PROTOCOL_VERSION}\n{HELP}");
            return Ok(());
        }
        Invocation::Unexpected(arg) => {
            eprintln!("error: unexpected argument '{arg}'\nUsage: dbsrvd [--help | --version]");
            std::process::exit(2);
        }
    }

    let config = Config::load()?;

    LogRotation::DAEMON.apply(&config.log_path);
    append_log_line(&config.log_path, &startup_marker())?;

    let log_guard = setup_logging(&config)?;

    info!("Starting daemon");

    let StartupResult {
        mut daemon,
        listener: unix_listener,
        lead_cache,
    } = match lifecycle::startup(&config) {
        Ok(r) => r,
        Err(LifecycleError::LockFailed(_)) => {
            let owner = std::fs::read_to_string(&config.lock_path).unwrap_or_default();
            match owner.trim() {
                "" => eprintln!("dbsrvd is already running"),
                pid => eprintln!("dbsrvd is already running (pid {pid})"),
            }
            std::process::exit(1);
        }
        Err(e) => {
            // tracing may not flush before exit
            let _ = append_log_line(
                &config.log_path,
                &format!("ERROR Failed to start daemon: {e}"),
            );
            error!("Failed to start daemon: {}", e);
            drop(log_guard);
            return Err(e.into());
        }
    };

    let shutdown_requested = Arc::new(Notify::new());
    tokio::spawn(
        Listener::new(
            unix_listener,
            Arc::clone(&daemon.ctx),
            Arc::clone(&shutdown_requested),
        )
        .run(),
    );
    let cache_task = tokio::spawn(lead_cache.run());

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!(socket = %config.socket_path.display(), "console listening");
    println!("READY");

    // SIGTERM lets calls finish; SIGINT downs workers at once.
    let mode = tokio::select! {
        _ = shutdown_requested.notified() => daemon.ctx.shutdown_state(),
        _ = sigterm.recv() => ShutdownState::Graceful,
        _ = sigint.recv() => ShutdownState::Immediate,
    };
    info!(%mode, "stopping server");

    daemon.shutdown(mode)?;
    if tokio::time::timeout(CACHE_STOP_TIMEOUT, cache_task)
        .await
        .is_err()
    {
        warn!("lead item cache did not stop in time");
    }
    info!("Daemon stopped");
    Ok(())
}

/// First line of each start attempt in `daemon.log`, followed by the pid.
/// `dbsrv` reads startup failures from after the newest one.
const STARTUP_MARKER: &str = "--- dbsrvd: starting (pid: ";

/// Size-triggered rotation of `daemon.log` into `daemon.log.1..=keep`,
/// `.1` being the newest.
struct LogRotation {
    max_size: u64,
    keep: u32,
}

impl LogRotation {
    const DAEMON: LogRotation = LogRotation {
        max_size: 10 * 1024 * 1024,
        keep: 3,
    };

    fn rotated(log: &Path, n: u32) -> PathBuf {
        let mut name = log.as_os_str().to_owned();
        name.push(format!(".{n}"));
        PathBuf::from(name)
    }

    /// Rotate `log` if it has outgrown `max_size`. The oldest rotation is
    /// overwritten. Rename failures leave the log growing.
    fn apply(&self, log: &Path) -> bool {
        match std::fs::metadata(log) {
            Ok(meta) if meta.len() > self.max_size => {}
            _ => return false,
        }
        for n in (1..self.keep).rev() {
            let _ = std::fs::rename(Self::rotated(log, n), Self::rotated(log, n + 1));
        }
        std::fs::rename(log, Self::rotated(log, 1)).is_ok()
    }
}

/// Append one line to the log outside tracing, so it is on disk before
/// the non-blocking writer starts or after it is gone.
fn append_log_line(log: &Path, line: &str) -> std::io::Result<()> {
    use std::io::Write;

    if let Some(parent) = log.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log)?;
    writeln!(file, "{line}")
}

fn startup_marker() -> String {
    format!("{STARTUP_MARKER}{}) ---", std::process::id())
}

fn setup_logging(
    config: &Config,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if let Some(parent) = config.log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let file_appender = tracing_appender::rolling::never(
        config.log_path.parent().ok_or(LifecycleError::NoStateDir)?,
        config
            .log_path
            .file_name()
            .ok_or(LifecycleError::NoStateDir)?,
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
