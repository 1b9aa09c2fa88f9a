// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment knobs read by the CLI.

use std::path::PathBuf;
use std::time::Duration;

use crate::client::ClientError;

/// Same resolution as the daemon, so both agree on the socket path.
pub fn state_dir() -> Result<PathBuf, ClientError> {
    dbsrv_daemon::env::state_dir().map_err(|_| ClientError::NoStateDir)
}

/// `DBSRV_DAEMON_BINARY`, when set and non-empty.
pub fn daemon_binary() -> Option<PathBuf> {
    std::env::var_os("DBSRV_DAEMON_BINARY")
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}

fn millis(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// How long the CLI waits on the daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// One request/response exchange.
    pub ipc: Duration,
    /// A freshly spawned daemon answering its first ping.
    pub connect: Duration,
    /// The daemon process exiting after a stop.
    pub exit: Duration,
    /// Pause between readiness and exit checks.
    pub poll: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            ipc: Duration::from_secs(5),
            connect: Duration::from_secs(5),
            exit: Duration::from_secs(2),
            poll: Duration::from_millis(50),
        }
    }
}

impl Timeouts {
    /// Defaults, overridden by `DBSRV_TIMEOUT_{IPC,CONNECT,EXIT}_MS` and
    /// `DBSRV_CONNECT_POLL_MS`.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            ipc: millis("DBSRV_TIMEOUT_IPC_MS").unwrap_or(default.ipc),
            connect: millis("DBSRV_TIMEOUT_CONNECT_MS").unwrap_or(default.connect),
            exit: millis("DBSRV_TIMEOUT_EXIT_MS").unwrap_or(default.exit),
            poll: millis("DBSRV_CONNECT_POLL_MS").unwrap_or(default.poll),
        }
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
