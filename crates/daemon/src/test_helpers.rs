// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Context builders shared by the daemon's unit tests.

use std::sync::Arc;

use dbsrv_core::{
    FakeClock, LeadItemRecord, LeadItemSnapshot, LookupStatus, ServerConfig, SnapshotPermissions,
    Timestamp, WorkerRegistry, WorkerSlot,
};

use crate::server::ServerContext;
use crate::sink::{MemorySink, OutputSink};

pub struct TestServer {
    pub ctx: Arc<ServerContext>,
    pub sink: Arc<MemorySink>,
    pub clock: FakeClock,
}

/// Running server with `slots` workers, all started and free.
pub fn running_server(slots: usize) -> TestServer {
    let server = bare_server(slots);
    server.ctx.start_workers().unwrap();
    server
}

/// Server whose registry holds exactly `slots`, as given.
pub fn server_with_slots(slots: Vec<WorkerSlot>) -> TestServer {
    let capacity = slots.len();
    let TestServer { ctx, sink, clock } = bare_server(capacity);
    let ctx = Arc::into_inner(ctx)
        .unwrap()
        .with_registry(WorkerRegistry::from_slots(capacity, slots));
    TestServer {
        ctx: Arc::new(ctx),
        sink,
        clock,
    }
}

fn bare_server(slots: usize) -> TestServer {
    let config = ServerConfig {
        worker_slots: slots,
        max_activities: slots as i64,
        ..ServerConfig::default()
    };
    let sink = Arc::new(MemorySink::new(&config.log_file));
    let clock = FakeClock::new();
    let ctx = ServerContext::new(
        config,
        Arc::clone(&sink) as Arc<dyn OutputSink>,
        Arc::new(clock.clone()),
        Arc::new(SnapshotPermissions),
    );
    TestServer {
        ctx: Arc::new(ctx),
        sink,
        clock,
    }
}

/// Publish a good lead item allowing `principals`.
pub fn allow(ctx: &ServerContext, principals: &[&str]) {
    ctx.lead_items.publish(LeadItemSnapshot {
        record: Some(LeadItemRecord {
            owner: "admin".to_string(),
            principals: principals.iter().map(|p| p.to_string()).collect(),
            version: 1,
        }),
        status: LookupStatus::OK,
        refreshed_at: Some(Timestamp(0)),
        generation: 1,
    });
}
