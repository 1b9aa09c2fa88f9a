// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Security lead-item cache.
//!
//! One task refreshes the lead item from the directory service on a fixed
//! interval and publishes it through the server's double buffer. Shutdown
//! is observed only before and after each refresh.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dbsrv_core::{DirectoryLookup, LeadItemSnapshot, LookupStatus, ResourceName};
use tokio::sync::Notify;
use tracing::{debug, info, warn};

use crate::server::ServerContext;
use crate::sink::Destinations;

/// Result of one refresh iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published { status: LookupStatus, changed: bool },
    Closed,
}

#[derive(Default)]
struct CacheControl {
    stop: AtomicBool,
    subsystem_down: AtomicBool,
    closed: AtomicBool,
    wake: Notify,
}

/// Daemon-side control of a running cache task.
#[derive(Clone)]
pub struct LeadItemCacheHandle {
    control: Arc<CacheControl>,
}

impl LeadItemCacheHandle {
    /// Ask the cache to close at its next checkpoint.
    pub fn request_stop(&self) {
        self.control.stop.store(true, Ordering::SeqCst);
        self.control.wake.notify_one();
    }

    /// The subsystem owning the directory service went away.
    pub fn subsystem_down(&self) {
        self.control.subsystem_down.store(true, Ordering::SeqCst);
        self.control.wake.notify_one();
    }

    pub fn is_closed(&self) -> bool {
        self.control.closed.load(Ordering::SeqCst)
    }
}

pub struct LeadItemCache {
    ctx: Arc<ServerContext>,
    directory: Arc<dyn DirectoryLookup>,
    resource: ResourceName,
    control: Arc<CacheControl>,
    last_status: LookupStatus,
    generation: u64,
}

impl LeadItemCache {
    pub fn new(
        ctx: Arc<ServerContext>,
        directory: Arc<dyn DirectoryLookup>,
        resource: ResourceName,
    ) -> (Self, LeadItemCacheHandle) {
        let control = Arc::new(CacheControl::default());
        let handle = LeadItemCacheHandle {
            control: Arc::clone(&control),
        };
        let cache = Self {
            ctx,
            directory,
            resource,
            control,
            last_status: LookupStatus::PENDING,
            generation: 0,
        };
        (cache, handle)
    }

    fn should_close(&self) -> bool {
        self.control.stop.load(Ordering::SeqCst)
            || self.control.subsystem_down.load(Ordering::SeqCst)
            || self.ctx.is_shutting_down()
    }

    fn close(&self) -> RefreshOutcome {
        self.control.closed.store(true, Ordering::SeqCst);
        info!(resource = %self.resource, "lead item cache closed");
        RefreshOutcome::Closed
    }

    /// Run a single refresh: look up, publish, log a status change.
    pub fn refresh_once(&mut self) -> RefreshOutcome {
        if self.should_close() {
            return self.close();
        }

        let result = self.directory.lookup(&self.resource);
        self.generation += 1;
        let status = result.status;
        self.ctx.lead_items.publish(LeadItemSnapshot {
            record: result.record,
            status,
            refreshed_at: Some(self.ctx.clock.now()),
            generation: self.generation,
        });

        let changed = status != self.last_status;
        if changed {
            self.report_status_change(status);
            self.last_status = status;
        } else {
            debug!(resource = %self.resource, %status, "lead item refreshed");
        }

        if self.should_close() {
            return self.close();
        }
        RefreshOutcome::Published { status, changed }
    }

    fn report_status_change(&self, status: LookupStatus) {
        let text = format!(
            "Lead item {} status changed from {} to {}",
            self.resource, self.last_status, status
        );
        if status.is_ok() {
            info!(resource = %self.resource, %status, "lead item status changed");
        } else {
            warn!(resource = %self.resource, %status, "lead item lookup failed");
        }
        if let Err(e) = self
            .ctx
            .sink
            .append(Destinations::LOG | Destinations::STDOUT, &text)
        {
            warn!(error = %e, "failed to log lead item status");
        }
    }

    /// Refresh until closed. The interval is re-read every iteration.
    pub async fn run(mut self) {
        info!(resource = %self.resource, "lead item cache started");
        loop {
            if self.refresh_once() == RefreshOutcome::Closed {
                break;
            }
            let interval = self.ctx.config.read().lead_item_interval();
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.control.wake.notified() => {}
            }
        }
    }
}

#[cfg(test)]
#[path = "lead_cache_tests.rs"]
mod tests;
