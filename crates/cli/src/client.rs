// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Client side of the daemon socket.

use std::process::Child;
use std::time::Duration;

use dbsrv_daemon::protocol::{self, ProtocolError, StopMode};
use dbsrv_daemon::{Request, Response, PROTOCOL_VERSION};
use thiserror::Error;
use tokio::net::UnixStream;
use tokio::time::Instant;

use crate::daemon_process::{is_alive, send_signal, spawn_daemon, wait_for_exit, DaemonFiles, Signal};
use crate::env::Timeouts;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Daemon not running")]
    NotRunning,

    #[error("Failed to start daemon: {0}")]
    StartFailed(String),

    #[error("Daemon did not answer within {0:?} of starting")]
    StartTimeout(Duration),

    #[error("{0}")]
    Protocol(#[from] ProtocolError),

    #[error("Daemon rejected the request: {0}")]
    Rejected(String),

    #[error("Daemon sent an unexpected reply to {0}")]
    Unexpected(&'static str),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("Could not determine state directory")]
    NoStateDir,
}

impl ClientError {
    /// True when nothing is listening on the socket.
    pub fn is_not_running(&self) -> bool {
        match self {
            ClientError::NotRunning => true,
            ClientError::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::ConnectionRefused | std::io::ErrorKind::NotFound
            ),
            _ => false,
        }
    }
}

pub struct DaemonClient {
    files: DaemonFiles,
    timeouts: Timeouts,
}

impl DaemonClient {
    /// Client for a daemon that must already be running.
    pub fn connect() -> Result<Self, ClientError> {
        let client = Self::attach(DaemonFiles::locate()?, Timeouts::from_env());
        if !client.files.socket().exists() {
            return Err(ClientError::NotRunning);
        }
        Ok(client)
    }

    /// Client for whatever is (or is not) behind `files`.
    pub(crate) fn attach(files: DaemonFiles, timeouts: Timeouts) -> Self {
        Self { files, timeouts }
    }

    /// Client for a running daemon of this build, starting one if needed.
    /// A daemon from another build is stopped immediately and replaced.
    pub async fn connect_or_start() -> Result<Self, ClientError> {
        let client = Self::attach(DaemonFiles::locate()?, Timeouts::from_env());
        match client.version().await {
            Ok(version) if version == PROTOCOL_VERSION => return Ok(client),
            Ok(version) => {
                eprintln!(
                    "warn: daemon version {version} does not match cli version {PROTOCOL_VERSION}, restarting daemon"
                );
                client.stop(StopMode::Immediate).await?;
            }
            Err(e) if e.is_not_running() => {
                client.files.remove_stale();
            }
            Err(e) => return Err(e),
        }
        let child = spawn_daemon()?;
        client.await_ready(child).await?;
        Ok(client)
    }

    /// Ping a freshly spawned daemon until it answers or gives up.
    async fn await_ready(&self, mut child: Child) -> Result<(), ClientError> {
        let deadline = Instant::now() + self.timeouts.connect;
        while Instant::now() < deadline {
            if let Some(status) = child.try_wait()? {
                let reason = self
                    .files
                    .startup_failure()
                    .unwrap_or_else(|| format!("dbsrvd exited with {status}"));
                return Err(ClientError::StartFailed(reason));
            }
            if self.ping().await.is_ok() {
                return Ok(());
            }
            tokio::time::sleep(self.timeouts.poll).await;
        }
        Err(match self.files.startup_failure() {
            Some(reason) => ClientError::StartFailed(reason),
            None => ClientError::StartTimeout(self.timeouts.connect),
        })
    }

    /// One exchange on a fresh connection. `Rejected` becomes an error here
    /// so callers only match the reply they expect.
    async fn request(&self, request: &Request) -> Result<Response, ClientError> {
        let mut stream = UnixStream::connect(self.files.socket()).await?;
        protocol::send(&mut stream, request, self.timeouts.ipc).await?;
        match protocol::recv(&mut stream, self.timeouts.ipc).await? {
            Response::Rejected { reason } => Err(ClientError::Rejected(reason)),
            response => Ok(response),
        }
    }

    pub async fn ping(&self) -> Result<(), ClientError> {
        match self.request(&Request::Ping).await? {
            Response::Pong => Ok(()),
            _ => Err(ClientError::Unexpected("Ping")),
        }
    }

    /// The daemon's build version, via the `Hello` exchange.
    pub async fn version(&self) -> Result<String, ClientError> {
        let hello = Request::Hello {
            version: PROTOCOL_VERSION.to_string(),
        };
        match self.request(&hello).await? {
            Response::Hello { version } => Ok(version),
            _ => Err(ClientError::Unexpected("Hello")),
        }
    }

    /// Run one console command line and return its reply lines.
    pub async fn console(&self, command: &str) -> Result<Vec<String>, ClientError> {
        let request = Request::Console {
            command: command.to_string(),
        };
        match self.request(&request).await? {
            Response::Console { lines } => Ok(lines),
            _ => Err(ClientError::Unexpected("Console")),
        }
    }

    pub async fn shutdown(&self, mode: StopMode) -> Result<StopMode, ClientError> {
        match self.request(&Request::Shutdown { mode }).await? {
            Response::ShuttingDown { mode } => Ok(mode),
            _ => Err(ClientError::Unexpected("Shutdown")),
        }
    }

    /// Shut the daemon down and wait for its process to exit, signalling
    /// it when the request cannot be delivered or it outlives the exit
    /// timeout. Returns false if no daemon was running.
    pub async fn stop(&self, mode: StopMode) -> Result<bool, ClientError> {
        let pid = self.files.pid();
        let requested = match self.shutdown(mode).await {
            Ok(_) => true,
            Err(e) if e.is_not_running() || pid.is_some() => false,
            Err(e) => return Err(e),
        };

        let Some(pid) = pid.filter(|&pid| is_alive(pid)) else {
            self.files.remove_stale();
            return Ok(requested);
        };
        if !requested {
            send_signal(pid, Signal::Term);
        }
        let Timeouts { exit, poll, .. } = self.timeouts;
        if !wait_for_exit(pid, exit, poll).await {
            send_signal(pid, Signal::Kill);
            wait_for_exit(pid, exit, poll).await;
        }
        self.files.remove_stale();
        Ok(true)
    }
}

#[cfg(test)]
#[path = "client_tests.rs"]
mod tests;
