// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The daemon's files in the state directory, and the process-level
//! controls the CLI falls back on when a request is not enough.

use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Duration;

use tokio::time::Instant;

use crate::client::ClientError;

const DAEMON_BINARY: &str = "dbsrvd";

/// The daemon writes this at the top of each start attempt in its log.
const STARTUP_MARKER: &str = "--- dbsrvd: starting (pid: ";
const STARTUP_FAILURE: &str = "Failed to start daemon: ";

/// Paths the daemon owns under one state directory.
#[derive(Debug, Clone)]
pub struct DaemonFiles {
    dir: PathBuf,
}

impl DaemonFiles {
    pub fn locate() -> Result<Self, ClientError> {
        Ok(Self::at(crate::env::state_dir()?))
    }

    pub fn at(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn socket(&self) -> PathBuf {
        self.dir.join("daemon.sock")
    }

    /// Lock file holding the daemon's pid.
    pub fn pid_file(&self) -> PathBuf {
        self.dir.join("daemon.pid")
    }

    pub fn log(&self) -> PathBuf {
        self.dir.join("daemon.log")
    }

    pub fn pid(&self) -> Option<u32> {
        let text = std::fs::read_to_string(self.pid_file()).ok()?;
        text.trim().parse().ok()
    }

    /// Reason the most recent start attempt gave up, if it logged one.
    pub fn startup_failure(&self) -> Option<String> {
        parse_startup_failure(&std::fs::read_to_string(self.log()).ok()?)
    }

    /// Remove the socket and pid file unless the recorded pid is alive.
    /// Returns whether anything was removed.
    pub fn remove_stale(&self) -> bool {
        if self.pid().is_some_and(is_alive) {
            return false;
        }
        let socket = std::fs::remove_file(self.socket()).is_ok();
        let pid = std::fs::remove_file(self.pid_file()).is_ok();
        socket || pid
    }
}

/// Text after the failure prefix on the last failure line that follows
/// the newest startup marker. Failures from earlier attempts are ignored.
pub fn parse_startup_failure(log: &str) -> Option<String> {
    let attempt = log.get(log.rfind(STARTUP_MARKER)?..)?;
    attempt
        .lines()
        .rev()
        .find_map(|line| line.split_once(STARTUP_FAILURE))
        .map(|(_, reason)| reason.trim().to_string())
}

/// Signals sent through `kill(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// Signal 0: delivery check only.
    Exists,
    Term,
    Kill,
}

impl Signal {
    fn flag(self) -> &'static str {
        match self {
            Signal::Exists => "-0",
            Signal::Term => "-TERM",
            Signal::Kill => "-KILL",
        }
    }
}

/// Returns whether `kill` delivered the signal.
pub fn send_signal(pid: u32, signal: Signal) -> bool {
    Command::new("kill")
        .args([signal.flag(), &pid.to_string()])
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

pub fn is_alive(pid: u32) -> bool {
    send_signal(pid, Signal::Exists)
}

/// Poll until `pid` is gone. Returns false if it outlived `timeout`.
pub async fn wait_for_exit(pid: u32, timeout: Duration, poll: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if !is_alive(pid) {
            return true;
        }
        tokio::time::sleep(poll).await;
    }
    !is_alive(pid)
}

/// `DBSRV_DAEMON_BINARY`, else `dbsrvd` next to this executable, else
/// `dbsrvd` from `PATH`.
pub fn daemon_binary() -> PathBuf {
    if let Some(path) = crate::env::daemon_binary() {
        return path;
    }
    std::env::current_exe()
        .ok()
        .as_deref()
        .and_then(Path::parent)
        .map(|dir| dir.join(DAEMON_BINARY))
        .filter(|sibling| sibling.exists())
        .unwrap_or_else(|| PathBuf::from(DAEMON_BINARY))
}

/// Start `dbsrvd` detached from this terminal.
pub fn spawn_daemon() -> Result<Child, ClientError> {
    let binary = daemon_binary();
    Command::new(&binary)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| ClientError::StartFailed(format!("{}: {e}", binary.display())))
}

#[cfg(test)]
#[path = "daemon_process_tests.rs"]
mod tests;
