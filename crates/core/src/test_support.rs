// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::worker::{ConnectionHandle, ConnectionId, SecondaryKey, WorkerSlot, WorkerState};

/// An assigned slot serving connection `id` under `key`.
pub fn assigned_slot(id: u32, key: &str) -> WorkerSlot {
    WorkerSlot {
        state: WorkerState::Assigned,
        handle: ConnectionHandle::new(ConnectionId(id), 0x100 + id),
        key: SecondaryKey::new(key),
        ..WorkerSlot::default()
    }
}

pub fn free_slot() -> WorkerSlot {
    WorkerSlot {
        state: WorkerState::Free,
        ..WorkerSlot::default()
    }
}

pub fn downed_slot(state: WorkerState) -> WorkerSlot {
    WorkerSlot {
        state,
        ..WorkerSlot::default()
    }
}
