// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! dbsrv daemon library
//!
//! The server control block, operator console and lead-item cache, plus
//! the IPC protocol types used by the CLI.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod console;
pub mod directory;
pub mod env;
pub mod lead_cache;
pub mod lifecycle;
pub mod listener;
pub mod protocol;
pub mod server;
pub mod sink;

#[cfg(test)]
mod test_helpers;

pub use console::{dispatch, ConsoleError, Origin, Reply};
pub use directory::FileDirectory;
pub use lead_cache::{LeadItemCache, LeadItemCacheHandle, RefreshOutcome};
pub use protocol::{Request, Response, StopMode, DEFAULT_TIMEOUT, MAX_FRAME_LEN, PROTOCOL_VERSION};
pub use server::{AdmissionError, ServerContext, ServerCounts, ServerState};
pub use sink::{Destinations, FileSink, OutputSink, SinkError};
