// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dbsrv_core::{
    ConfigError, ConfigFile, RegistryError, ResourceName, ServerConfig, Severity, ShutdownState,
    SnapshotPermissions, SystemClock,
};
use fs2::FileExt;
use thiserror::Error;
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::directory::FileDirectory;
use crate::lead_cache::{LeadItemCache, LeadItemCacheHandle};
use crate::server::ServerContext;
use crate::sink::{FileSink, OutputSink, SinkError};

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/dbsrv)
    pub state_dir: PathBuf,
    /// Path to Unix socket
    pub socket_path: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to daemon log file
    pub log_path: PathBuf,
    /// Optional startup parameters
    pub server_config_path: PathBuf,
    /// Directory the operator log file is created in
    pub console_log_dir: PathBuf,
    /// Directory per-worker trace files are created in
    pub trace_dir: PathBuf,
    /// Root of the file-backed directory service
    pub directory_path: PathBuf,
}

impl Config {
    /// Load configuration for the user-level daemon.
    ///
    /// Uses fixed paths under `~/.local/state/dbsrv/` (or `$XDG_STATE_HOME/dbsrv/`).
    pub fn load() -> Result<Self, LifecycleError> {
        Ok(Self::for_state_dir(crate::env::state_dir()?))
    }

    pub fn for_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        Self {
            socket_path: state_dir.join("daemon.sock"),
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            server_config_path: state_dir.join("server.toml"),
            console_log_dir: state_dir.clone(),
            trace_dir: state_dir.join("traces"),
            directory_path: state_dir.join("directory"),
            state_dir,
        }
    }
}

/// Daemon state during operation.
pub struct DaemonState {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    /// Server control block (shared with listener and cache)
    pub ctx: Arc<ServerContext>,
    pub cache: LeadItemCacheHandle,
}

/// Result of daemon startup: the daemon state plus the tasks to spawn.
pub struct StartupResult {
    pub daemon: DaemonState,
    /// The Unix socket listener to spawn as a task
    pub listener: UnixListener,
    /// The lead-item refresh loop to spawn as a task
    pub lead_cache: LeadItemCache,
}

impl DaemonState {
    /// Shut the server down and remove the daemon's runtime files.
    pub fn shutdown(&mut self, mode: ShutdownState) -> Result<(), LifecycleError> {
        info!("Shutting down daemon...");

        // A shutdown requested over IPC has already been broadcast.
        if !self.ctx.is_shutting_down() {
            self.ctx.request_shutdown(mode);
        }
        self.cache.request_stop();

        for (path, what) in [
            (&self.config.socket_path, "socket"),
            (&self.config.lock_path, "PID"),
        ] {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Failed to remove {} file: {}", what, e);
                }
            }
        }

        // Lock file is released automatically when self.lock_file is dropped
        info!("Daemon shutdown complete");
        Ok(())
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("Failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid lead item resource name: {0}")]
    InvalidResource(String),

    #[error("Output sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Worker registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the daemon
pub fn startup(config: &Config) -> Result<StartupResult, LifecycleError> {
    match startup_inner(config) {
        Ok(result) => Ok(result),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock —
            // those files belong to the already-running daemon.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

fn startup_inner(config: &Config) -> Result<StartupResult, LifecycleError> {
    // 1. Create state directory (needed for socket, lock, etc.)
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents races
    // Use OpenOptions to avoid truncating the file before we hold the lock,
    // which would wipe the running daemon's PID.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;

    use std::io::Write;
    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Trace and directory-service roots
    std::fs::create_dir_all(&config.trace_dir)?;
    std::fs::create_dir_all(&config.directory_path)?;

    // 4. Startup parameters
    let server_config = load_server_config(&config.server_config_path)?;
    let resource = ResourceName::parse(&server_config.lead_item_resource)
        .ok_or_else(|| LifecycleError::InvalidResource(server_config.lead_item_resource.clone()))?;

    // 5. Server context and workers
    let sink = FileSink::open(
        &config.console_log_dir,
        &config.trace_dir,
        &server_config.log_file,
    )?;
    let ctx = Arc::new(ServerContext::new(
        server_config,
        Arc::new(sink) as Arc<dyn OutputSink>,
        Arc::new(SystemClock::new()),
        Arc::new(SnapshotPermissions),
    ));
    let workers = ctx.start_workers()?;

    let (lead_cache, cache) = LeadItemCache::new(
        Arc::clone(&ctx),
        Arc::new(FileDirectory::new(&config.directory_path)),
        resource,
    );

    // 6. Bind socket, replacing a stale one left by a crashed daemon
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;

    info!(
        workers,
        socket = %config.socket_path.display(),
        "Daemon started"
    );

    Ok(StartupResult {
        daemon: DaemonState {
            config: config.clone(),
            lock_file,
            ctx,
            cache,
        },
        listener,
        lead_cache,
    })
}

/// Read `server.toml` if present. Rejected and defaulted values are logged
/// and startup continues.
fn load_server_config(path: &Path) -> Result<ServerConfig, LifecycleError> {
    let Some(file) = ConfigFile::load(path)? else {
        info!(path = %path.display(), "no server config file, using defaults");
        return Ok(ServerConfig::default());
    };
    let (config, updates) = ServerConfig::from_file(&file)?;
    for update in updates {
        match update.severity {
            Severity::Ok => {}
            Severity::Warning => warn!(
                param = %update.param,
                requested = %update.requested,
                applied = update.applied.as_deref().unwrap_or_default(),
                "config value out of range, default applied"
            ),
            Severity::Error => warn!(
                param = %update.param,
                requested = %update.requested,
                kept = %update.previous,
                "config value rejected"
            ),
        }
    }
    Ok(config)
}

fn cleanup_on_failure(config: &Config) {
    for path in [&config.socket_path, &config.lock_path] {
        if path.exists() {
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
