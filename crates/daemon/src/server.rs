// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server control block shared by the console, the lead-item cache and
//! worker activities.

use std::fmt;
use std::sync::Arc;

use dbsrv_core::{
    Access, Clock, ConnectionHandle, ConnectionId, LeadItemBuffer, PermissionValidator,
    RegistryError, SecondaryKey, ServerConfig, ShutdownState, ShutdownSummary, SlotIndex,
    Timestamp, WorkerRegistry, WorkerState,
};
use parking_lot::{Mutex, RwLock};
use thiserror::Error;
use tracing::{info, warn};

use crate::sink::OutputSink;

/// Lifecycle of the server as a whole.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Initializing,
    Running,
    ShuttingDown,
}

impl fmt::Display for ServerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerState::Initializing => write!(f, "INITIALIZING"),
            ServerState::Running => write!(f, "RUNNING"),
            ServerState::ShuttingDown => write!(f, "SHUTTING DOWN"),
        }
    }
}

/// Most recent client request seen by any worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LastRequest {
    pub at: Timestamp,
    pub connection: ConnectionId,
    pub slot: SlotIndex,
}

/// Server-wide counters, reset by `CLEAR SERVER COUNTS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ServerCounts {
    pub connections: u64,
    pub requests: u64,
    pub last_request: Option<LastRequest>,
}

impl ServerCounts {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[derive(Debug, Clone, Copy)]
struct Lifecycle {
    state: ServerState,
    shutdown: ShutdownState,
}

/// Why a client connection was turned away.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("server is shutting down")]
    ShuttingDown,

    #[error("principal {0} is not authorized")]
    Denied(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),
}

pub struct ServerContext {
    pub registry: WorkerRegistry,
    pub config: RwLock<ServerConfig>,
    pub counts: Mutex<ServerCounts>,
    pub lead_items: LeadItemBuffer,
    pub sink: Arc<dyn OutputSink>,
    pub clock: Arc<dyn Clock>,
    permissions: Arc<dyn PermissionValidator>,
    lifecycle: Mutex<Lifecycle>,
    started_at: Timestamp,
}

impl ServerContext {
    pub fn new(
        config: ServerConfig,
        sink: Arc<dyn OutputSink>,
        clock: Arc<dyn Clock>,
        permissions: Arc<dyn PermissionValidator>,
    ) -> Self {
        let started_at = clock.now();
        Self {
            registry: WorkerRegistry::new(config.worker_slots),
            config: RwLock::new(config),
            counts: Mutex::new(ServerCounts::default()),
            lead_items: LeadItemBuffer::new(),
            sink,
            clock,
            permissions,
            lifecycle: Mutex::new(Lifecycle {
                state: ServerState::Initializing,
                shutdown: ShutdownState::Active,
            }),
            started_at,
        }
    }

    /// Replace the registry with one pre-populated for tests.
    #[cfg(test)]
    pub fn with_registry(mut self, registry: WorkerRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn state(&self) -> ServerState {
        self.lifecycle.lock().state
    }

    pub fn shutdown_state(&self) -> ShutdownState {
        self.lifecycle.lock().shutdown
    }

    pub fn is_shutting_down(&self) -> bool {
        self.state() == ServerState::ShuttingDown
    }

    pub fn uptime_ms(&self) -> u64 {
        self.started_at.elapsed_until(self.clock.now())
    }

    /// Start every registry slot and mark it ready, then declare the server
    /// running. Returns the number of workers started.
    pub fn start_workers(&self) -> Result<usize, RegistryError> {
        let mut started = 0;
        while self.registry.allocated() < self.registry.capacity() {
            let index = self.registry.start_worker()?;
            self.registry.mark_ready(index)?;
            started += 1;
        }
        self.lifecycle.lock().state = ServerState::Running;
        info!(workers = started, "server running");
        Ok(started)
    }

    /// Move to `ShuttingDown` and pass `mode` to every worker. A second
    /// request can only escalate graceful to immediate.
    pub fn request_shutdown(&self, mode: ShutdownState) -> ShutdownSummary {
        {
            let mut lifecycle = self.lifecycle.lock();
            let escalates = matches!(
                (lifecycle.shutdown, mode),
                (ShutdownState::Active, ShutdownState::Graceful | ShutdownState::Immediate)
                    | (ShutdownState::Graceful, ShutdownState::Immediate)
            );
            if !escalates {
                return ShutdownSummary::default();
            }
            lifecycle.state = ServerState::ShuttingDown;
            lifecycle.shutdown = mode;
        }
        let summary = self.registry.broadcast_shutdown(mode);
        info!(
            mode = %mode,
            notified = summary.notified,
            downed = summary.downed,
            "shutdown requested"
        );
        summary
    }

    /// Admit a new client connection: check the principal against the
    /// current lead-item snapshot, then hand it a free worker.
    pub fn admit(
        &self,
        principal: &str,
        handle: ConnectionHandle,
        key: SecondaryKey,
    ) -> Result<SlotIndex, AdmissionError> {
        if self.is_shutting_down() {
            return Err(AdmissionError::ShuttingDown);
        }
        let snapshot = self.lead_items.current();
        if self.permissions.validate(principal, &snapshot) == Access::Deny {
            warn!(principal, connection = %handle.id(), "connection refused");
            return Err(AdmissionError::Denied(principal.to_string()));
        }
        let limit = self.config.read().admission_limit();
        let index = self.registry.assign(handle, key, limit)?;
        self.counts.lock().connections += 1;
        Ok(index)
    }

    /// The client on `index` went away.
    pub fn disconnect(&self, index: SlotIndex) -> Result<WorkerState, RegistryError> {
        self.registry.release(index)
    }

    /// Count a client request on an assigned worker. A worker with debug
    /// flags set and a trace file bound gets one record per request there.
    pub fn note_request(&self, index: SlotIndex) -> Result<(), RegistryError> {
        let now = self.clock.now();
        self.registry.record_request(index, now)?;
        let Some(slot) = self.registry.snapshot(index) else {
            return Err(RegistryError::NotAssigned(index));
        };
        let connection = slot.connection_id();
        {
            let mut counts = self.counts.lock();
            counts.requests += 1;
            counts.last_request = Some(LastRequest {
                at: now,
                connection,
                slot: index,
            });
        }

        if let Some(trace) = slot.trace.as_ref().filter(|_| slot.settings.debug_flags != 0) {
            let record = format!(
                "{now} request {} connection {connection} debug {} memory {} words",
                slot.request_count, slot.settings.debug_flags, slot.allocated_memory_words
            );
            if let Err(e) = self.sink.append_trace(trace.handle, &record) {
                warn!(%connection, trace = %trace.name, error = %e, "trace write failed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "server_tests.rs"]
mod tests;
