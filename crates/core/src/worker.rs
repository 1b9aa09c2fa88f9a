// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker slot types: lifecycle state, connection handles, secondary keys.

use std::fmt;

use crate::clock::Timestamp;
use crate::reuse::ResourceReuseCache;

/// Lifecycle of a worker slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WorkerState {
    #[default]
    Closed,
    Initializing,
    Free,
    Assigned,
    DownedGracefully,
    DownedImmediately,
    DownedDueToError,
}

impl WorkerState {
    pub fn is_downed(self) -> bool {
        matches!(
            self,
            WorkerState::DownedGracefully
                | WorkerState::DownedImmediately
                | WorkerState::DownedDueToError
        )
    }

    /// Whether the lifecycle permits moving from `self` to `to`.
    pub fn can_transition(self, to: WorkerState) -> bool {
        use WorkerState::*;
        matches!(
            (self, to),
            (Closed, Initializing)
                | (Initializing, Free)
                | (Initializing, DownedDueToError)
                | (Free, Assigned)
                | (Assigned, Free)
                | (Free, DownedGracefully | DownedImmediately | DownedDueToError)
                | (Assigned, DownedGracefully | DownedImmediately | DownedDueToError)
        )
    }

    pub fn label(self) -> &'static str {
        match self {
            WorkerState::Closed => "CLOSED",
            WorkerState::Initializing => "INITIALIZING",
            WorkerState::Free => "FREE",
            WorkerState::Assigned => "ASSIGNED",
            WorkerState::DownedGracefully => "DOWNED GRACEFULLY",
            WorkerState::DownedImmediately => "DOWNED IMMEDIATELY",
            WorkerState::DownedDueToError => "DOWNED DUE TO ERROR",
        }
    }
}

impl fmt::Display for WorkerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Shutdown request observed by a worker (and by the server as a whole).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownState {
    #[default]
    Active,
    Graceful,
    Immediate,
}

impl fmt::Display for ShutdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownState::Active => write!(f, "ACTIVE"),
            ShutdownState::Graceful => write!(f, "GRACEFUL"),
            ShutdownState::Immediate => write!(f, "IMMEDIATE"),
        }
    }
}

/// Externally visible connection id (upper half of a [`ConnectionHandle`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ConnectionId(pub u32);

impl ConnectionId {
    /// Lookup sentinel: "the first assigned worker with a non-zero id".
    pub const FIRST_ASSIGNED: ConnectionId = ConnectionId(u32::MAX);

    pub fn is_first_assigned(self) -> bool {
        self == Self::FIRST_ASSIGNED
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_first_assigned() {
            f.write_str("*")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Composite handle: connection id in the upper 32 bits, transport-internal
/// sub-handle in the lower 32 bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConnectionHandle(pub u64);

impl ConnectionHandle {
    pub fn new(id: ConnectionId, sub_handle: u32) -> Self {
        Self((u64::from(id.0) << 32) | u64::from(sub_handle))
    }

    pub fn id(self) -> ConnectionId {
        ConnectionId((self.0 >> 32) as u32)
    }

    pub fn sub_handle(self) -> u32 {
        (self.0 & 0xFFFF_FFFF) as u32
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:08X}", self.id(), self.sub_handle())
    }
}

/// Total width of a secondary key.
pub const SECONDARY_KEY_WIDTH: usize = 12;

/// Leading positions of a secondary key that take part in comparisons.
pub const SECONDARY_KEY_VISIBLE: usize = 8;

/// Fixed-width, blank-padded textual key (e.g. a session name). Only the
/// first [`SECONDARY_KEY_VISIBLE`] positions are compared; the rest are
/// reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SecondaryKey([u8; SECONDARY_KEY_WIDTH]);

impl SecondaryKey {
    pub const BLANK: SecondaryKey = SecondaryKey([b' '; SECONDARY_KEY_WIDTH]);

    /// Build a key from text: upper-cased, truncated to the full width and
    /// blank padded. Non-ASCII characters become `?`.
    pub fn new(text: &str) -> Self {
        let mut bytes = [b' '; SECONDARY_KEY_WIDTH];
        for (slot, ch) in bytes.iter_mut().zip(text.chars()) {
            *slot = if ch.is_ascii() {
                ch.to_ascii_uppercase() as u8
            } else {
                b'?'
            };
        }
        Self(bytes)
    }

    pub fn visible(&self) -> &[u8] {
        &self.0[..SECONDARY_KEY_VISIBLE]
    }

    pub fn matches(&self, other: &SecondaryKey) -> bool {
        self.visible() == other.visible()
    }

    pub fn is_blank(&self) -> bool {
        self.visible().iter().all(|b| *b == b' ')
    }

    /// Visible prefix with trailing blanks removed.
    pub fn as_text(&self) -> String {
        String::from_utf8_lossy(self.visible()).trim_end().to_string()
    }
}

impl Default for SecondaryKey {
    fn default() -> Self {
        Self::BLANK
    }
}

impl fmt::Display for SecondaryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_text())
    }
}

/// Console-settable per-worker values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    pub receive_timeout_ms: i64,
    pub fetch_block_size: i64,
    pub debug_flags: i64,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            receive_timeout_ms: 0,
            fetch_block_size: 2_048,
            debug_flags: 0,
        }
    }
}

/// Opaque handle of an open trace destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TraceHandle(pub u64);

/// A worker's currently open trace destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceBinding {
    pub handle: TraceHandle,
    pub name: String,
}

/// One registry entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkerSlot {
    pub state: WorkerState,
    pub shutdown: ShutdownState,
    pub handle: ConnectionHandle,
    pub key: SecondaryKey,
    pub allocated_memory_words: u64,
    pub first_request: Option<Timestamp>,
    pub last_request: Option<Timestamp>,
    pub request_count: u64,
    pub in_external_call: bool,
    pub settings: WorkerSettings,
    pub trace: Option<TraceBinding>,
    pub reuse: ResourceReuseCache,
}

impl WorkerSlot {
    pub fn connection_id(&self) -> ConnectionId {
        self.handle.id()
    }

    pub fn is_assigned(&self) -> bool {
        self.state == WorkerState::Assigned
    }

    /// Clear per-connection data when a client leaves. Settings, trace
    /// binding and the reuse cache belong to the worker, not the client.
    pub(crate) fn clear_connection(&mut self) {
        self.handle = ConnectionHandle::default();
        self.key = SecondaryKey::BLANK;
        self.allocated_memory_words = 0;
        self.first_request = None;
        self.last_request = None;
        self.request_count = 0;
        self.in_external_call = false;
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
