// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `DISPLAY` handlers. Read-only; worker output is a snapshot taken slot by
//! slot, not a consistent view of the whole registry.

use std::fmt::Write as _;

use dbsrv_core::{
    format_idle, format_uptime, ConfigParam, ConfigPart, ConnectionId, OperationKind,
    SecondaryKey, SlotIndex, WorkerSlot,
};

use super::{ConfigSelection, ConsoleError, DisplayTarget, Origin, Reply, Route};
use crate::protocol::PROTOCOL_VERSION;
use crate::server::ServerContext;
use crate::sink::Destinations;

pub(super) fn display(
    ctx: &ServerContext,
    origin: &mut Origin,
    target: &DisplayTarget,
    route: Route,
) -> Result<Reply, ConsoleError> {
    let text = match target {
        DisplayTarget::ServerStatus => server_status(ctx),
        DisplayTarget::ServerLevel => server_level(ctx),
        DisplayTarget::Worker(id) => worker(ctx, *id)?,
        DisplayTarget::WorkerKey(key) => worker_by_key(ctx, key)?,
        DisplayTarget::WorkerAll { in_call_only } => all_workers(ctx, *in_call_only),
        DisplayTarget::WorkerShort => short_workers(ctx),
        DisplayTarget::Configuration(selection) => configuration(ctx, *selection),
        DisplayTarget::Filenames => filenames(ctx),
        #[cfg(feature = "dev-commands")]
        DisplayTarget::LeadItem => lead_item(ctx),
        #[cfg(feature = "dev-commands")]
        DisplayTarget::WorkerDump(id) => {
            let index = find(ctx, *id)?;
            format!("{:#?}", ctx.registry.snapshot(index))
        }
    };
    deliver(ctx, origin, route, text)
}

/// Send a finished display block where `route` says.
fn deliver(
    ctx: &ServerContext,
    origin: &mut Origin,
    route: Route,
    text: String,
) -> Result<Reply, ConsoleError> {
    match route {
        Route::Reply => Ok(Reply::Pending(text)),
        Route::ReplyAndLog => {
            ctx.sink.append(Destinations::LOG, &text)?;
            origin.reply(text);
            Ok(Reply::AlreadyReplied)
        }
        Route::LogOnly => {
            ctx.sink.append(Destinations::LOG, &text)?;
            Ok(Reply::Pending("Display written to log".to_string()))
        }
    }
}

fn server_status(ctx: &ServerContext) -> String {
    let config = ctx.config.read();
    let counts = ctx.registry.counts();
    let server = *ctx.counts.lock();
    let lead = ctx.lead_items.current();

    let mut out = String::new();
    let _ = writeln!(out, "Server {} status: {}", config.server_name, ctx.state());
    let _ = writeln!(out, "  Uptime            {}", format_uptime(ctx.uptime_ms()));
    let _ = writeln!(out, "  Shutdown          {}", ctx.shutdown_state());
    let _ = writeln!(
        out,
        "  Workers           {} slots, {} allocated, {} free, {} assigned, {} downed",
        counts.capacity, counts.allocated, counts.free, counts.assigned, counts.downed
    );
    let _ = writeln!(out, "  Max activities    {}", config.max_activities);
    let _ = writeln!(out, "  Connections       {}", server.connections);
    let _ = writeln!(out, "  Requests          {}", server.requests);
    match server.last_request {
        Some(last) => {
            let _ = writeln!(
                out,
                "  Last request      {} connection {} worker {}",
                last.at, last.connection, last.slot
            );
        }
        None => {
            let _ = writeln!(out, "  Last request      none");
        }
    }
    match lead.refreshed_at {
        Some(at) => {
            let _ = write!(
                out,
                "  Lead item         {} status {} refreshed {}",
                config.lead_item_resource, lead.status, at
            );
        }
        None => {
            let _ = write!(
                out,
                "  Lead item         {} not yet refreshed",
                config.lead_item_resource
            );
        }
    }
    out
}

fn server_level(ctx: &ServerContext) -> String {
    let variant = if cfg!(feature = "dev-commands") {
        " (development)"
    } else {
        ""
    };
    format!(
        "Server {} level {}{}",
        ctx.config.read().server_name,
        PROTOCOL_VERSION,
        variant
    )
}

fn find(ctx: &ServerContext, id: ConnectionId) -> Result<SlotIndex, ConsoleError> {
    ctx.registry
        .find_by_connection_id(id)
        .map_err(|_| ConsoleError::NotFound {
            what: "Connection id",
            key: id.to_string(),
        })
}

fn worker(ctx: &ServerContext, id: ConnectionId) -> Result<String, ConsoleError> {
    let index = find(ctx, id)?;
    let slot = ctx
        .registry
        .snapshot(index)
        .ok_or_else(|| ConsoleError::NotFound {
            what: "Connection id",
            key: id.to_string(),
        })?;
    Ok(worker_detail(ctx, index, &slot))
}

fn worker_by_key(ctx: &ServerContext, key: &str) -> Result<String, ConsoleError> {
    let not_found = || ConsoleError::NotFound {
        what: "Key",
        key: key.to_string(),
    };
    let id = ctx
        .registry
        .find_by_secondary_key(&SecondaryKey::new(key))
        .ok_or_else(not_found)?;
    // The worker may have been released between the two scans.
    worker(ctx, id).map_err(|_| not_found())
}

fn all_workers(ctx: &ServerContext, in_call_only: bool) -> String {
    let blocks: Vec<String> = ctx
        .registry
        .list_assigned()
        .filter(|(_, slot)| !in_call_only || slot.in_external_call)
        .map(|(index, slot)| worker_detail(ctx, index, &slot))
        .collect();
    if blocks.is_empty() {
        return if in_call_only {
            "No workers in a database call".to_string()
        } else {
            "No assigned workers".to_string()
        };
    }
    blocks.join("\n")
}

fn worker_detail(ctx: &ServerContext, index: SlotIndex, slot: &WorkerSlot) -> String {
    let time = |t: Option<dbsrv_core::Timestamp>| t.map_or("-".to_string(), |t| t.to_string());
    let trace = slot
        .trace
        .as_ref()
        .map_or("none".to_string(), |t| t.name.clone());
    let reuse = match (slot.reuse.kind(), slot.reuse.record()) {
        (OperationKind::Transactional, Some(record)) => format!(
            "transactional thread for {} (reused {})",
            record.identity,
            slot.reuse.reuse_count()
        ),
        _ => "none".to_string(),
    };
    let idle = slot.last_request.map_or("-".to_string(), |t| {
        format_idle(t.elapsed_until(ctx.clock.now()))
    });

    let mut out = String::new();
    let _ = writeln!(out, "Worker {}: {}", index, slot.state);
    let _ = writeln!(out, "  Connection        {}", slot.handle);
    let _ = writeln!(out, "  Key               {}", slot.key);
    let _ = writeln!(out, "  Shutdown          {}", slot.shutdown);
    let _ = writeln!(out, "  Requests          {}", slot.request_count);
    let _ = writeln!(out, "  First request     {}", time(slot.first_request));
    let _ = writeln!(out, "  Last request      {}", time(slot.last_request));
    let _ = writeln!(out, "  Idle              {idle}");
    let _ = writeln!(out, "  Memory words      {}", slot.allocated_memory_words);
    let _ = writeln!(
        out,
        "  In database call  {}",
        if slot.in_external_call { "YES" } else { "NO" }
    );
    let _ = writeln!(out, "  Debug             {}", slot.settings.debug_flags);
    let _ = writeln!(out, "  Receive timeout   {}", slot.settings.receive_timeout_ms);
    let _ = writeln!(out, "  Fetch block size  {}", slot.settings.fetch_block_size);
    let _ = writeln!(out, "  Trace file        {trace}");
    let _ = write!(out, "  Reuse             {reuse}");
    out
}

fn short_workers(ctx: &ServerContext) -> String {
    let now = ctx.clock.now();
    let mut out = format!(
        "{:<6}{:<12}{:<10}{:<10}{}",
        "SLOT", "CONNECTION", "KEY", "REQUESTS", "IDLE"
    );
    for (index, slot) in ctx.registry.list_assigned() {
        let idle = slot
            .last_request
            .map_or("-".to_string(), |t| format_idle(t.elapsed_until(now)));
        let _ = write!(
            out,
            "\n{:<6}{:<12}{:<10}{:<10}{}",
            index.to_string(),
            slot.connection_id().to_string(),
            slot.key.to_string(),
            slot.request_count.to_string(),
            idle
        );
    }
    out
}

fn configuration(ctx: &ServerContext, selection: ConfigSelection) -> String {
    let config = ctx.config.read();
    let parts: &[ConfigPart] = match selection {
        ConfigSelection::All => &[ConfigPart::Part1, ConfigPart::Part2],
        ConfigSelection::Part(ConfigPart::Part1) => &[ConfigPart::Part1],
        ConfigSelection::Part(ConfigPart::Part2) => &[ConfigPart::Part2],
    };

    let mut out = String::new();
    for part in parts {
        if !out.is_empty() {
            out.push('\n');
        }
        let number = match part {
            ConfigPart::Part1 => 1,
            ConfigPart::Part2 => 2,
        };
        let _ = write!(out, "Configuration part {number}");
        for param in ConfigParam::ALL.into_iter().filter(|p| p.part() == *part) {
            let _ = write!(out, "\n  {:<26}{}", param.display_name(), config.get(param));
        }
    }
    out
}

fn filenames(ctx: &ServerContext) -> String {
    let config = ctx.config.read();
    format!(
        "Log file          {}\nTrace file        {}",
        config.log_file, config.trace_file
    )
}

#[cfg(feature = "dev-commands")]
fn lead_item(ctx: &ServerContext) -> String {
    let snapshot = ctx.lead_items.current();
    format!(
        "Lead item slot {} generation {} status {}\n{:#?}",
        ctx.lead_items.current_index(),
        snapshot.generation,
        snapshot.status,
        snapshot.record
    )
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
