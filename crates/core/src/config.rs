// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Server configuration parameters.
//!
//! [`ConfigParam`] is the fixed table of operator-settable parameters. Each
//! entry knows its console name, its value kind and bounds, and which
//! `DISPLAY CONFIGURATION` part lists it. [`ServerConfig`] holds the live
//! values; every write goes through [`crate::config_value`].

use std::collections::BTreeMap;
use std::fmt;
use std::ops::RangeInclusive;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::config_value::{
    parse_int, parse_switch, switch_text, validate_filename, validate_int, validate_str, Severity,
    UpdateMode,
};

/// Hard ceiling for `MAX ACTIVITIES`.
pub const MAX_ACTIVITIES_LIMIT: i64 = 2000;

/// Registry capacity used when the config file does not name one.
pub const DEFAULT_WORKER_SLOTS: usize = 16;

/// Value shape of a parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamKind {
    Int {
        bounds: RangeInclusive<i64>,
        default: Option<i64>,
    },
    Str {
        length: RangeInclusive<usize>,
        default: Option<&'static str>,
    },
    Filename {
        length: RangeInclusive<usize>,
    },
    Switch,
}

/// The `SET` family a parameter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamScope {
    /// `SET [SERVER] <param>=<value>`
    Server,
    /// `SET TRANSPORT <param>=<value>`
    Transport,
    /// `SET LOG CONSOLE OUTPUT=<value>`
    Console,
}

/// Which half of `DISPLAY CONFIGURATION` lists a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigPart {
    Part1,
    Part2,
}

/// Operator-settable server parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigParam {
    MaxActivities,
    ServerReceiveTimeout,
    ServerSendTimeout,
    ClientReceiveTimeout,
    FetchBlockSize,
    ReuseLimit,
    LeadItemInterval,
    Debug,
    LogFile,
    TraceFile,
    TransportMode,
    TransportKeepAlive,
    TransportBacklog,
    LogConsoleOutput,
}

impl ConfigParam {
    pub const ALL: [ConfigParam; 14] = [
        ConfigParam::MaxActivities,
        ConfigParam::ServerReceiveTimeout,
        ConfigParam::ServerSendTimeout,
        ConfigParam::ClientReceiveTimeout,
        ConfigParam::FetchBlockSize,
        ConfigParam::ReuseLimit,
        ConfigParam::LeadItemInterval,
        ConfigParam::Debug,
        ConfigParam::LogFile,
        ConfigParam::TraceFile,
        ConfigParam::TransportMode,
        ConfigParam::TransportKeepAlive,
        ConfigParam::TransportBacklog,
        ConfigParam::LogConsoleOutput,
    ];

    /// Name as typed after the scope keyword(s) of a `SET` command.
    pub fn keyword(self) -> &'static str {
        match self {
            ConfigParam::MaxActivities => "MAX ACTIVITIES",
            ConfigParam::ServerReceiveTimeout => "SERVER RECEIVE TIMEOUT",
            ConfigParam::ServerSendTimeout => "SERVER SEND TIMEOUT",
            ConfigParam::ClientReceiveTimeout => "CLIENT RECEIVE TIMEOUT",
            ConfigParam::FetchBlockSize => "FETCH BLOCK SIZE",
            ConfigParam::ReuseLimit => "REUSE LIMIT",
            ConfigParam::LeadItemInterval => "LEAD ITEM INTERVAL",
            ConfigParam::Debug => "DEBUG",
            ConfigParam::LogFile => "LOG FILE",
            ConfigParam::TraceFile => "TRACE FILE",
            ConfigParam::TransportMode => "MODE",
            ConfigParam::TransportKeepAlive => "KEEP ALIVE",
            ConfigParam::TransportBacklog => "BACKLOG",
            ConfigParam::LogConsoleOutput => "LOG CONSOLE OUTPUT",
        }
    }

    /// Fully qualified name used in replies and configuration dumps.
    pub fn display_name(self) -> String {
        match self.scope() {
            ParamScope::Transport => format!("TRANSPORT {}", self.keyword()),
            ParamScope::Server | ParamScope::Console => self.keyword().to_string(),
        }
    }

    /// Key used in the `[parameters]` table of `server.toml`.
    pub fn config_key(self) -> String {
        self.display_name().to_ascii_lowercase().replace(' ', "_")
    }

    pub fn scope(self) -> ParamScope {
        match self {
            ConfigParam::TransportMode
            | ConfigParam::TransportKeepAlive
            | ConfigParam::TransportBacklog => ParamScope::Transport,
            ConfigParam::LogConsoleOutput => ParamScope::Console,
            _ => ParamScope::Server,
        }
    }

    pub fn part(self) -> ConfigPart {
        match self {
            ConfigParam::LogFile
            | ConfigParam::TraceFile
            | ConfigParam::TransportMode
            | ConfigParam::TransportKeepAlive
            | ConfigParam::TransportBacklog
            | ConfigParam::LogConsoleOutput => ConfigPart::Part2,
            _ => ConfigPart::Part1,
        }
    }

    pub fn kind(self) -> ParamKind {
        let int = |lo: i64, hi: i64, default: Option<i64>| ParamKind::Int {
            bounds: lo..=hi,
            default,
        };
        match self {
            ConfigParam::MaxActivities => int(1, MAX_ACTIVITIES_LIMIT, None),
            ConfigParam::ServerReceiveTimeout => int(1_000, 300_000, Some(30_000)),
            ConfigParam::ServerSendTimeout => int(1_000, 300_000, Some(30_000)),
            ConfigParam::ClientReceiveTimeout => int(0, 3_600_000, Some(0)),
            ConfigParam::FetchBlockSize => int(1, 65_535, Some(2_048)),
            ConfigParam::ReuseLimit => int(0, 10_000, Some(100)),
            ConfigParam::LeadItemInterval => int(1, 3_600, Some(60)),
            ConfigParam::Debug => int(0, 65_535, None),
            ConfigParam::LogFile | ConfigParam::TraceFile => {
                ParamKind::Filename { length: 1..=128 }
            }
            ConfigParam::TransportMode => ParamKind::Str {
                length: 1..=1,
                default: Some("A"),
            },
            ConfigParam::TransportBacklog => int(1, 1_024, Some(64)),
            ConfigParam::TransportKeepAlive | ConfigParam::LogConsoleOutput => ParamKind::Switch,
        }
    }

    /// Resolve a parameter from its keyword within a scope. `words` must be
    /// upper-case and single-space separated.
    pub fn lookup(scope: ParamScope, words: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.scope() == scope && p.keyword() == words)
    }

    fn from_config_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.config_key() == key)
    }
}

impl fmt::Display for ConfigParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Outcome of one parameter write, with everything a reply needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamUpdate {
    pub param: ConfigParam,
    pub requested: String,
    pub previous: String,
    pub severity: Severity,
    /// Display form of the value now in effect, `None` when rejected.
    pub applied: Option<String>,
}

/// Live server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub server_name: String,
    /// Registry capacity, fixed at startup.
    pub worker_slots: usize,
    /// Resource name the lead-item cache refreshes.
    pub lead_item_resource: String,
    pub max_activities: i64,
    pub server_receive_timeout_ms: i64,
    pub server_send_timeout_ms: i64,
    pub client_receive_timeout_ms: i64,
    pub fetch_block_size: i64,
    pub reuse_limit: i64,
    pub lead_item_interval_secs: i64,
    pub debug: i64,
    pub log_file: String,
    pub trace_file: String,
    pub transport_mode: String,
    pub transport_keep_alive: bool,
    pub transport_backlog: i64,
    pub log_console_output: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_name: "DBSRV".to_string(),
            worker_slots: DEFAULT_WORKER_SLOTS,
            lead_item_resource: "DBSRV*SECURITY".to_string(),
            max_activities: DEFAULT_WORKER_SLOTS as i64,
            server_receive_timeout_ms: 30_000,
            server_send_timeout_ms: 30_000,
            client_receive_timeout_ms: 0,
            fetch_block_size: 2_048,
            reuse_limit: 100,
            lead_item_interval_secs: 60,
            debug: 0,
            log_file: "console.log".to_string(),
            trace_file: "trace.log".to_string(),
            transport_mode: "A".to_string(),
            transport_keep_alive: true,
            transport_backlog: 64,
            log_console_output: false,
        }
    }
}

impl ServerConfig {
    /// Display form of a parameter's current value.
    pub fn get(&self, param: ConfigParam) -> String {
        match param {
            ConfigParam::LogFile => self.log_file.clone(),
            ConfigParam::TraceFile => self.trace_file.clone(),
            ConfigParam::TransportMode => self.transport_mode.clone(),
            ConfigParam::TransportKeepAlive => switch_text(self.transport_keep_alive).to_string(),
            ConfigParam::LogConsoleOutput => switch_text(self.log_console_output).to_string(),
            _ => self.int_field(param).map(|v| v.to_string()).unwrap_or_default(),
        }
    }

    /// Validate `raw` for `param` and, unless `mode` is validate-only, apply it.
    pub fn set(&mut self, param: ConfigParam, raw: &str, mode: UpdateMode) -> ParamUpdate {
        let previous = self.get(param);
        let severity = match param.kind() {
            ParamKind::Int { bounds, default } => match parse_int(raw) {
                Some(value) => match self.int_field_mut(param) {
                    Some(field) => validate_int(field, value, mode, &bounds, default).severity,
                    None => Severity::Error,
                },
                None => Severity::Error,
            },
            ParamKind::Str { length, default } => {
                let field = self.string_field_mut(param);
                validate_str(field, raw, mode, &length, default).severity
            }
            ParamKind::Filename { length } => {
                let field = self.string_field_mut(param);
                validate_filename(field, raw, mode, &length, None).severity
            }
            ParamKind::Switch => match parse_switch(raw) {
                Some(on) => {
                    if mode != UpdateMode::ValidateOnly {
                        *self.switch_field_mut(param) = on;
                    }
                    Severity::Ok
                }
                None => Severity::Error,
            },
        };

        let applied = if severity.is_error() {
            None
        } else {
            Some(self.get(param))
        };
        ParamUpdate {
            param,
            requested: raw.to_string(),
            previous,
            severity,
            applied,
        }
    }

    pub fn lead_item_interval(&self) -> Duration {
        Duration::from_secs(self.lead_item_interval_secs.max(1) as u64)
    }

    /// Number of workers that may be assigned at once: the operator limit,
    /// capped by the fixed registry capacity.
    pub fn admission_limit(&self) -> usize {
        (self.max_activities.max(0) as usize).min(self.worker_slots)
    }

    /// Build the startup configuration from a parsed config file. Each
    /// parameter goes through the validator in allow-default mode; the
    /// returned updates carry any warnings or errors for the caller to log.
    pub fn from_file(file: &ConfigFile) -> Result<(Self, Vec<ParamUpdate>), ConfigError> {
        let mut config = Self::default();
        if let Some(name) = &file.server_name {
            config.server_name.clone_from(name);
        }
        if let Some(slots) = file.worker_slots {
            if slots == 0 || slots as i64 > MAX_ACTIVITIES_LIMIT {
                return Err(ConfigError::InvalidWorkerSlots(slots));
            }
            config.worker_slots = slots;
            config.max_activities = slots as i64;
        }
        if let Some(resource) = &file.lead_item_resource {
            config.lead_item_resource.clone_from(resource);
        }

        let mut updates = Vec::new();
        for (key, value) in &file.parameters {
            let param = ConfigParam::from_config_key(key)
                .ok_or_else(|| ConfigError::UnknownParameter(key.clone()))?;
            let raw = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Integer(i) => i.to_string(),
                toml::Value::Boolean(b) => switch_text(*b).to_string(),
                other => other.to_string(),
            };
            updates.push(config.set(param, &raw, UpdateMode::UpdateAllowDefault));
        }
        Ok((config, updates))
    }

    fn int_field(&self, param: ConfigParam) -> Option<i64> {
        Some(match param {
            ConfigParam::MaxActivities => self.max_activities,
            ConfigParam::ServerReceiveTimeout => self.server_receive_timeout_ms,
            ConfigParam::ServerSendTimeout => self.server_send_timeout_ms,
            ConfigParam::ClientReceiveTimeout => self.client_receive_timeout_ms,
            ConfigParam::FetchBlockSize => self.fetch_block_size,
            ConfigParam::ReuseLimit => self.reuse_limit,
            ConfigParam::LeadItemInterval => self.lead_item_interval_secs,
            ConfigParam::Debug => self.debug,
            ConfigParam::TransportBacklog => self.transport_backlog,
            _ => return None,
        })
    }

    fn int_field_mut(&mut self, param: ConfigParam) -> Option<&mut i64> {
        Some(match param {
            ConfigParam::MaxActivities => &mut self.max_activities,
            ConfigParam::ServerReceiveTimeout => &mut self.server_receive_timeout_ms,
            ConfigParam::ServerSendTimeout => &mut self.server_send_timeout_ms,
            ConfigParam::ClientReceiveTimeout => &mut self.client_receive_timeout_ms,
            ConfigParam::FetchBlockSize => &mut self.fetch_block_size,
            ConfigParam::ReuseLimit => &mut self.reuse_limit,
            ConfigParam::LeadItemInterval => &mut self.lead_item_interval_secs,
            ConfigParam::Debug => &mut self.debug,
            ConfigParam::TransportBacklog => &mut self.transport_backlog,
            _ => return None,
        })
    }

    fn string_field_mut(&mut self, param: ConfigParam) -> &mut String {
        match param {
            ConfigParam::LogFile => &mut self.log_file,
            ConfigParam::TraceFile => &mut self.trace_file,
            _ => &mut self.transport_mode,
        }
    }

    fn switch_field_mut(&mut self, param: ConfigParam) -> &mut bool {
        match param {
            ConfigParam::TransportKeepAlive => &mut self.transport_keep_alive,
            _ => &mut self.log_console_output,
        }
    }
}

/// Contents of `server.toml`.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub server_name: Option<String>,
    pub worker_slots: Option<usize>,
    pub lead_item_resource: Option<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, toml::Value>,
}

impl ConfigFile {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load the config file at `path`; a missing file is `Ok(None)`.
    pub fn load(path: &Path) -> Result<Option<Self>, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ConfigError::Io(e)),
        }
    }
}

/// Errors loading the startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown configuration parameter: {0}")]
    UnknownParameter(String),

    #[error("worker_slots must be between 1 and 2000, got {0}")]
    InvalidWorkerSlots(usize),
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
