// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator console: parses a command line, runs it against the server
//! context and delivers exactly one reply to whoever sent it.

mod display;
mod help;
pub mod parse;
mod set;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::server::ServerContext;
use crate::sink::{Destinations, SinkError};

pub use parse::{parse, ClientSetting, Command, ConfigSelection, DisplayTarget, Route};

/// What a handler leaves for the dispatcher to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// The handler already wrote every sink it needed, origin included.
    AlreadyReplied,
    /// Send this text to the origin.
    Pending(String),
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("Syntax error: {0}")]
    Syntax(String),

    #[error("{what} {key} not found")]
    NotFound { what: &'static str, key: String },

    #[error("Invalid value {value} for {param}; value not changed")]
    Invalid { param: String, value: String },

    #[error("{0}")]
    Sink(#[from] SinkError),
}

/// The sender of one console command and the replies it received.
#[derive(Debug, Default)]
pub struct Origin {
    replies: Vec<String>,
}

impl Origin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&mut self, text: impl Into<String>) {
        self.replies.push(text.into());
    }

    pub fn replies(&self) -> &[String] {
        &self.replies
    }

    /// Every reply split into lines, in order.
    pub fn lines(&self) -> Vec<String> {
        self.replies
            .iter()
            .flat_map(|r| r.lines().map(str::to_string))
            .collect()
    }
}

/// Run one console command line.
pub fn dispatch(ctx: &ServerContext, line: &str, origin: &mut Origin) {
    info!(command = %line.trim(), "console command");
    let sent_before = origin.replies().len();
    let result = parse(line).and_then(|command| execute(ctx, origin, command));

    // Output of an `AlreadyReplied` handler is in the log already.
    let handler_logged = matches!(result, Ok(Reply::AlreadyReplied));
    match result {
        Ok(Reply::AlreadyReplied) => {}
        Ok(Reply::Pending(text)) => origin.reply(text),
        Err(e) => {
            debug!(error = %e, "console command rejected");
            origin.reply(e.to_string());
        }
    }

    if ctx.config.read().log_console_output {
        let mut echo = format!("> {}", line.trim());
        if !handler_logged {
            for reply in origin.replies().get(sent_before..).unwrap_or_default() {
                echo.push('\n');
                echo.push_str(reply);
            }
        }
        if let Err(e) = ctx.sink.append(Destinations::LOG, &echo) {
            warn!(error = %e, "failed to echo console command to log");
        }
    }
}

fn execute(ctx: &ServerContext, origin: &mut Origin, command: Command) -> Result<Reply, ConsoleError> {
    match command {
        Command::Display { target, route } => display::display(ctx, origin, &target, route),
        Command::Set { param, value } => set::set_server(ctx, param, &value),
        Command::SetClient { id, setting, value } => set::set_client(ctx, id, setting, &value),
        Command::ClearServerCounts => {
            ctx.counts.lock().reset();
            info!("server counts cleared");
            Ok(Reply::Pending("Server counts cleared".to_string()))
        }
        Command::Help => Ok(Reply::Pending(help::text())),
    }
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
