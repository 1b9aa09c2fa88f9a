// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messages exchanged between `dbsrv` and `dbsrvd`.
//!
//! One request and one response per connection, each sent as a single
//! length-prefixed JSON frame.

use std::fmt;

use dbsrv_core::ShutdownState;
use serde::{Deserialize, Serialize};

#[path = "protocol_wire.rs"]
mod wire;
pub use wire::{
    read_frame, recv, recv_frame, send, to_frame, ProtocolError, DEFAULT_TIMEOUT, MAX_FRAME_LEN,
    PROTOCOL_VERSION,
};

/// How a shutdown request treats workers still inside a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StopMode {
    /// Let each worker finish its current call.
    #[default]
    Graceful,
    /// Down every worker at once.
    Immediate,
}

impl StopMode {
    pub fn from_immediate_flag(immediate: bool) -> Self {
        if immediate {
            StopMode::Immediate
        } else {
            StopMode::Graceful
        }
    }
}

impl fmt::Display for StopMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            StopMode::Graceful => "graceful",
            StopMode::Immediate => "immediate",
        })
    }
}

impl From<StopMode> for ShutdownState {
    fn from(mode: StopMode) -> Self {
        match mode {
            StopMode::Graceful => ShutdownState::Graceful,
            StopMode::Immediate => ShutdownState::Immediate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Request {
    Ping,

    /// Exchange build versions; the CLI replaces a daemon that differs.
    Hello { version: String },

    /// Run one operator console command line.
    Console { command: String },

    Shutdown {
        #[serde(default)]
        mode: StopMode,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum Response {
    Pong,

    Hello { version: String },

    /// Every reply the command produced, split into lines.
    Console { lines: Vec<String> },

    ShuttingDown { mode: StopMode },

    /// The request frame arrived but could not be understood.
    Rejected { reason: String },
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
