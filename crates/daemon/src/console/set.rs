// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `SET` handlers. Every value goes through the config validator before it
//! touches live state.

use std::ops::RangeInclusive;

use dbsrv_core::config_value::{parse_int, validate_filename, validate_int};
use dbsrv_core::{
    ConfigParam, ConnectionId, ParamUpdate, Severity, SlotIndex, TraceBinding, UpdateMode,
    WorkerSettings,
};
use tracing::{info, warn};

use super::{ClientSetting, ConsoleError, Reply};
use crate::server::ServerContext;

const CLIENT_TRACE_NAME_LENGTH: RangeInclusive<usize> = 1..=128;

pub(super) fn set_server(
    ctx: &ServerContext,
    param: ConfigParam,
    value: &str,
) -> Result<Reply, ConsoleError> {
    let mut config = ctx.config.write();

    if param == ConfigParam::LogFile {
        // Validate and open the new log before committing the name.
        let check = config.set(param, value, UpdateMode::ValidateOnly);
        if check.severity.is_error() {
            return Err(invalid(param.display_name(), value));
        }
        ctx.sink.switch_log(value)?;
    }

    let update = config.set(param, value, UpdateMode::UpdateAllowDefault);
    drop(config);
    server_reply(update)
}

fn server_reply(update: ParamUpdate) -> Result<Reply, ConsoleError> {
    let name = update.param.display_name();
    let applied = match (update.severity, update.applied) {
        (Severity::Error, _) | (_, None) => return Err(invalid(name, &update.requested)),
        (_, Some(applied)) => applied,
    };
    info!(param = %name, from = %update.previous, to = %applied, "server parameter changed");
    Ok(Reply::Pending(match update.severity {
        Severity::Warning => format!(
            "Value {} for {name} out of range; default {applied} applied",
            update.requested
        ),
        _ => format!("{name} changed from {} to {applied}", update.previous),
    }))
}

pub(super) fn set_client(
    ctx: &ServerContext,
    id: ConnectionId,
    setting: ClientSetting,
    value: &str,
) -> Result<Reply, ConsoleError> {
    let index = ctx
        .registry
        .find_by_connection_id(id)
        .map_err(|_| ConsoleError::NotFound {
            what: "Connection id",
            key: id.to_string(),
        })?;
    match setting {
        ClientSetting::TraceFile => set_client_trace(ctx, index, value),
        _ => set_client_value(ctx, index, setting, value),
    }
}

/// Bounds and default of a numeric per-worker setting.
fn client_bounds(setting: ClientSetting) -> (RangeInclusive<i64>, Option<i64>) {
    let defaults = WorkerSettings::default();
    match setting {
        ClientSetting::Debug => (0..=65_535, None),
        ClientSetting::ReceiveTimeout => (0..=3_600_000, Some(defaults.receive_timeout_ms)),
        ClientSetting::FetchBlockSize => (1..=65_535, Some(defaults.fetch_block_size)),
        ClientSetting::TraceFile => (0..=0, None),
    }
}

fn settings_field(settings: &mut WorkerSettings, setting: ClientSetting) -> &mut i64 {
    match setting {
        ClientSetting::ReceiveTimeout => &mut settings.receive_timeout_ms,
        ClientSetting::FetchBlockSize => &mut settings.fetch_block_size,
        _ => &mut settings.debug_flags,
    }
}

fn set_client_value(
    ctx: &ServerContext,
    index: SlotIndex,
    setting: ClientSetting,
    value: &str,
) -> Result<Reply, ConsoleError> {
    let number = parse_int(value).ok_or_else(|| invalid(setting.keyword(), value))?;
    let (bounds, default) = client_bounds(setting);
    let outcome = ctx.registry.update(index, |slot| {
        let field = settings_field(&mut slot.settings, setting);
        let previous = *field;
        let validation = validate_int(field, number, UpdateMode::UpdateAllowDefault, &bounds, default);
        (previous, validation, slot.connection_id())
    });
    let Some((previous, validation, connection)) = outcome else {
        return Err(invalid(setting.keyword(), value));
    };

    let name = setting.keyword();
    match (validation.severity, validation.applied) {
        (Severity::Ok, Some(applied)) => Ok(Reply::Pending(format!(
            "{name} for connection {connection} changed from {previous} to {applied}"
        ))),
        (Severity::Warning, Some(applied)) => Ok(Reply::Pending(format!(
            "Value {value} for {name} out of range; default {applied} applied to connection {connection}"
        ))),
        _ => Err(invalid(name, value)),
    }
}

/// Point the worker's trace at a new file. The previous trace is closed
/// before the new one is opened.
fn set_client_trace(ctx: &ServerContext, index: SlotIndex, name: &str) -> Result<Reply, ConsoleError> {
    let mut scratch = String::new();
    let check = validate_filename(
        &mut scratch,
        name,
        UpdateMode::ValidateOnly,
        &CLIENT_TRACE_NAME_LENGTH,
        None,
    );
    if !check.accepted() {
        return Err(invalid(ClientSetting::TraceFile.keyword(), name));
    }

    let (previous, connection) = ctx
        .registry
        .update(index, |slot| (slot.trace.take(), slot.connection_id()))
        .ok_or_else(|| invalid(ClientSetting::TraceFile.keyword(), name))?;
    if let Some(previous) = &previous {
        // Already detached from the slot.
        if let Err(e) = ctx.sink.close_trace(previous.handle) {
            warn!(%connection, trace = %previous.name, error = %e, "could not close worker trace");
        }
    }

    let handle = ctx.sink.open_trace(name)?;
    ctx.registry.update(index, |slot| {
        slot.trace = Some(TraceBinding {
            handle,
            name: name.to_string(),
        });
    });
    info!(connection = %connection, trace = name, "worker trace file changed");
    let opened = format!(
        "{} trace for connection {connection} opened",
        ctx.clock.now()
    );
    if let Err(e) = ctx.sink.append_trace(handle, &opened) {
        warn!(%connection, trace = name, error = %e, "trace write failed");
    }

    Ok(Reply::Pending(match previous {
        Some(previous) => format!(
            "TRACE FILE for connection {connection} changed from {} to {name}",
            previous.name
        ),
        None => format!("TRACE FILE for connection {connection} set to {name}"),
    }))
}

fn invalid(param: impl Into<String>, value: &str) -> ConsoleError {
    ConsoleError::Invalid {
        param: param.into(),
        value: value.to_string(),
    }
}

#[cfg(test)]
#[path = "set_tests.rs"]
mod tests;
