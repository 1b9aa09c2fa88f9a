// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded registry of worker slots.
//!
//! The slot array is sized once at startup and never grows. Lookups are
//! linear scans in allocation order and only ever hold the read lock of the
//! slot being examined, so console displays see a snapshot rather than a
//! consistent transaction and never wait on more than one worker.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};
use thiserror::Error;

use crate::clock::Timestamp;
use crate::reuse::{ReuseDecision, ReuseRecord, ReuseRequest};
use crate::worker::{
    ConnectionHandle, ConnectionId, SecondaryKey, ShutdownState, WorkerSlot, WorkerState,
};

/// Position of a slot in the registry (zero-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotIndex(pub usize);

impl SlotIndex {
    /// One-based slot number as shown to operators.
    pub fn number(self) -> usize {
        self.0 + 1
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// A lookup miss. Misses are data: callers decide what to tell the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("connection id {0} not found")]
    ConnectionNotFound(ConnectionId),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("all {0} worker slots are allocated")]
    Full(usize),

    #[error("admission limit of {0} assigned workers reached")]
    AdmissionLimit(usize),

    #[error("no free worker available")]
    NoFreeWorker,

    #[error("connection id {0} is reserved")]
    ReservedConnectionId(ConnectionId),

    #[error("connection id {0} is already assigned")]
    DuplicateConnection(ConnectionId),

    #[error("worker slot {slot} cannot move from {from} to {to}")]
    InvalidTransition {
        slot: SlotIndex,
        from: WorkerState,
        to: WorkerState,
    },

    #[error("worker slot {0} is not assigned")]
    NotAssigned(SlotIndex),

    #[error("no worker slot {0}")]
    NoSuchSlot(SlotIndex),
}

/// Aggregate worker counts for the control block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct WorkerCounts {
    pub capacity: usize,
    pub allocated: usize,
    pub free: usize,
    pub assigned: usize,
    pub downed: usize,
}

/// Result of broadcasting a shutdown request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShutdownSummary {
    /// Assigned workers told to shut down after their client leaves.
    pub notified: usize,
    /// Idle workers downed immediately.
    pub downed: usize,
}

#[derive(Debug, Default)]
struct CountCells {
    free: AtomicUsize,
    assigned: AtomicUsize,
    downed: AtomicUsize,
}

impl CountCells {
    fn cell(&self, state: WorkerState) -> Option<&AtomicUsize> {
        match state {
            WorkerState::Free => Some(&self.free),
            WorkerState::Assigned => Some(&self.assigned),
            s if s.is_downed() => Some(&self.downed),
            _ => None,
        }
    }

    fn moved(&self, from: WorkerState, to: WorkerState) {
        if let Some(cell) = self.cell(from) {
            cell.fetch_sub(1, Ordering::AcqRel);
        }
        if let Some(cell) = self.cell(to) {
            cell.fetch_add(1, Ordering::AcqRel);
        }
    }
}

pub struct WorkerRegistry {
    slots: Box<[RwLock<WorkerSlot>]>,
    /// Slots `0..allocated` have left `Closed` and take part in scans.
    allocated: AtomicUsize,
    /// Serializes slot allocation and assignment; never taken by lookups.
    admission: Mutex<()>,
    counts: CountCells,
}

impl WorkerRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: (0..capacity)
                .map(|_| RwLock::new(WorkerSlot::default()))
                .collect(),
            allocated: AtomicUsize::new(0),
            admission: Mutex::new(()),
            counts: CountCells::default(),
        }
    }

    /// Build a registry whose first slots are already populated.
    #[cfg(any(test, feature = "test-support"))]
    pub fn from_slots(capacity: usize, slots: Vec<WorkerSlot>) -> Self {
        let registry = Self::new(capacity.max(slots.len()));
        let allocated = slots.len();
        for (cell, slot) in registry.slots.iter().zip(slots) {
            registry.counts.moved(WorkerState::Closed, slot.state);
            *cell.write() = slot;
        }
        registry.allocated.store(allocated, Ordering::Release);
        registry
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn allocated(&self) -> usize {
        self.allocated.load(Ordering::Acquire)
    }

    pub fn counts(&self) -> WorkerCounts {
        WorkerCounts {
            capacity: self.capacity(),
            allocated: self.allocated(),
            free: self.counts.free.load(Ordering::Acquire),
            assigned: self.counts.assigned.load(Ordering::Acquire),
            downed: self.counts.downed.load(Ordering::Acquire),
        }
    }

    /// Allocate the next closed slot and move it to `Initializing`.
    pub fn start_worker(&self) -> Result<SlotIndex, RegistryError> {
        let _admission = self.admission.lock();
        let index = self.allocated();
        let cell = self
            .slots
            .get(index)
            .ok_or(RegistryError::Full(self.capacity()))?;
        {
            let mut slot = cell.write();
            slot.state = WorkerState::Initializing;
            slot.shutdown = ShutdownState::Active;
        }
        self.allocated.store(index + 1, Ordering::Release);
        Ok(SlotIndex(index))
    }

    /// A started worker finished initializing and can take clients.
    pub fn mark_ready(&self, index: SlotIndex) -> Result<(), RegistryError> {
        self.transition(index, WorkerState::Free)
    }

    /// Hand the first free worker to a new connection.
    ///
    /// `limit` is the current admission limit (assigned workers at once).
    pub fn assign(
        &self,
        handle: ConnectionHandle,
        key: SecondaryKey,
        limit: usize,
    ) -> Result<SlotIndex, RegistryError> {
        let id = handle.id();
        if id.0 == 0 || id.is_first_assigned() {
            return Err(RegistryError::ReservedConnectionId(id));
        }

        let _admission = self.admission.lock();
        if self.counts.assigned.load(Ordering::Acquire) >= limit {
            return Err(RegistryError::AdmissionLimit(limit));
        }
        if self.find_by_connection_id(id).is_ok() {
            return Err(RegistryError::DuplicateConnection(id));
        }

        for index in 0..self.allocated() {
            let mut slot = self.slots[index].write();
            if slot.state != WorkerState::Free {
                continue;
            }
            slot.state = WorkerState::Assigned;
            slot.handle = handle;
            slot.key = key;
            self.counts.moved(WorkerState::Free, WorkerState::Assigned);
            return Ok(SlotIndex(index));
        }
        Err(RegistryError::NoFreeWorker)
    }

    /// The client left: return the worker to `Free`, ready for reassignment.
    /// A worker flagged for graceful shutdown is downed instead.
    pub fn release(&self, index: SlotIndex) -> Result<WorkerState, RegistryError> {
        let mut slot = self.slot(index)?.write();
        if slot.state != WorkerState::Assigned {
            return Err(RegistryError::NotAssigned(index));
        }
        let to = match slot.shutdown {
            ShutdownState::Active => WorkerState::Free,
            ShutdownState::Graceful => WorkerState::DownedGracefully,
            ShutdownState::Immediate => WorkerState::DownedImmediately,
        };
        slot.state = to;
        slot.clear_connection();
        self.counts.moved(WorkerState::Assigned, to);
        Ok(to)
    }

    /// Move a slot along its lifecycle, rejecting illegal transitions.
    pub fn transition(&self, index: SlotIndex, to: WorkerState) -> Result<(), RegistryError> {
        let mut slot = self.slot(index)?.write();
        let from = slot.state;
        if !from.can_transition(to) {
            return Err(RegistryError::InvalidTransition {
                slot: index,
                from,
                to,
            });
        }
        slot.state = to;
        if to == WorkerState::Free {
            slot.clear_connection();
        }
        self.counts.moved(from, to);
        Ok(())
    }

    /// Record a client request against an assigned worker.
    pub fn record_request(&self, index: SlotIndex, now: Timestamp) -> Result<(), RegistryError> {
        let mut slot = self.slot(index)?.write();
        if slot.state != WorkerState::Assigned {
            return Err(RegistryError::NotAssigned(index));
        }
        slot.first_request.get_or_insert(now);
        slot.last_request = Some(now);
        slot.request_count += 1;
        Ok(())
    }

    /// Adjust the worker's allocated-memory counter by `delta` words.
    pub fn adjust_memory(&self, index: SlotIndex, delta: i64) -> Result<u64, RegistryError> {
        let mut slot = self.slot(index)?.write();
        slot.allocated_memory_words = if delta >= 0 {
            slot.allocated_memory_words.saturating_add(delta as u64)
        } else {
            slot.allocated_memory_words
                .saturating_sub(delta.unsigned_abs())
        };
        Ok(slot.allocated_memory_words)
    }

    /// Mark whether the worker is currently inside a database subsystem call.
    pub fn set_in_external_call(&self, index: SlotIndex, inside: bool) -> Result<(), RegistryError> {
        self.slot(index)?.write().in_external_call = inside;
        Ok(())
    }

    /// Copy of a slot as it is right now.
    pub fn snapshot(&self, index: SlotIndex) -> Option<WorkerSlot> {
        self.slots.get(index.0).map(|cell| cell.read().clone())
    }

    /// Mutate worker-owned fields (settings, trace binding, reuse cache).
    /// Any change the closure makes to the lifecycle state is discarded;
    /// [`WorkerRegistry::transition`] is the only way to move a worker.
    pub fn update<R>(&self, index: SlotIndex, f: impl FnOnce(&mut WorkerSlot) -> R) -> Option<R> {
        let cell = self.slots.get(index.0)?;
        let mut slot = cell.write();
        let state = slot.state;
        let result = f(&mut *slot);
        slot.state = state;
        Some(result)
    }

    /// Find the assigned worker serving connection `id`.
    ///
    /// [`ConnectionId::FIRST_ASSIGNED`] selects the first assigned worker
    /// (lowest slot) with a non-zero connection id.
    pub fn find_by_connection_id(&self, id: ConnectionId) -> Result<SlotIndex, LookupError> {
        let first_assigned = id.is_first_assigned();
        for index in 0..self.allocated() {
            let slot = self.slots[index].read();
            if !slot.is_assigned() {
                continue;
            }
            let slot_id = slot.connection_id();
            let hit = if first_assigned {
                slot_id.0 != 0
            } else {
                slot_id == id
            };
            if hit {
                return Ok(SlotIndex(index));
            }
        }
        Err(LookupError::ConnectionNotFound(id))
    }

    /// Resolve a secondary key to the connection id of the assigned worker
    /// holding it. Only the visible prefix of the key is compared.
    pub fn find_by_secondary_key(&self, key: &SecondaryKey) -> Option<ConnectionId> {
        (0..self.allocated()).find_map(|index| {
            let slot = self.slots[index].read();
            (slot.is_assigned() && slot.key.matches(key)).then(|| slot.connection_id())
        })
    }

    /// Lazy pass over the currently assigned workers.
    pub fn list_assigned(&self) -> AssignedSlots<'_> {
        AssignedSlots {
            registry: self,
            next: 0,
        }
    }

    /// Ask every worker to shut down. Assigned workers are flagged and finish
    /// their client first (unless `mode` is immediate, in which case they are
    /// downed now); idle workers are downed straight away.
    pub fn broadcast_shutdown(&self, mode: ShutdownState) -> ShutdownSummary {
        let downed_state = match mode {
            ShutdownState::Active => return ShutdownSummary::default(),
            ShutdownState::Graceful => WorkerState::DownedGracefully,
            ShutdownState::Immediate => WorkerState::DownedImmediately,
        };

        let mut summary = ShutdownSummary::default();
        for index in 0..self.allocated() {
            let mut slot = self.slots[index].write();
            slot.shutdown = mode;
            match slot.state {
                WorkerState::Assigned if mode == ShutdownState::Graceful => {
                    summary.notified += 1;
                }
                from @ (WorkerState::Assigned | WorkerState::Free) => {
                    slot.state = downed_state;
                    self.counts.moved(from, downed_state);
                    summary.downed += 1;
                }
                _ => {}
            }
        }
        summary
    }

    /// Decide whether the worker's current database thread can serve
    /// `request`, counting the reuse when granted.
    pub fn decide_reuse(
        &self,
        index: SlotIndex,
        request: &ReuseRequest,
        limit: u32,
    ) -> Option<ReuseDecision> {
        self.update(index, |slot| slot.reuse.decide(request, limit))
    }

    /// Record a freshly opened database thread for the worker.
    pub fn save_reuse(&self, index: SlotIndex, record: ReuseRecord) -> Option<()> {
        self.update(index, |slot| slot.reuse.save(record))
    }

    /// Forget the worker's database thread (closed or in doubt).
    pub fn invalidate_reuse(&self, index: SlotIndex) -> Option<()> {
        self.update(index, |slot| slot.reuse.invalidate())
    }

    fn slot(&self, index: SlotIndex) -> Result<&RwLock<WorkerSlot>, RegistryError> {
        self.slots
            .get(index.0)
            .ok_or(RegistryError::NoSuchSlot(index))
    }
}

/// Restartable iterator over assigned workers, yielding point-in-time copies.
///
/// Each step locks only the slot it inspects; workers changing state while
/// the pass is in progress are simply seen in whichever state they had.
#[derive(Clone)]
pub struct AssignedSlots<'a> {
    registry: &'a WorkerRegistry,
    next: usize,
}

impl AssignedSlots<'_> {
    /// Start the pass again from the first slot.
    pub fn rewind(&mut self) {
        self.next = 0;
    }
}

impl Iterator for AssignedSlots<'_> {
    type Item = (SlotIndex, WorkerSlot);

    fn next(&mut self) -> Option<Self::Item> {
        while self.next < self.registry.allocated() {
            let index = self.next;
            self.next += 1;
            let slot = self.registry.slots[index].read();
            if slot.is_assigned() {
                return Some((SlotIndex(index), slot.clone()));
            }
        }
        None
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
