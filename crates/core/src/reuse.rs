// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reuse decision for a worker's database thread.
//!
//! Opening a database thread is expensive, so a worker remembers the
//! attributes of the thread it last acquired. The next client may take the
//! thread over only when it was opened for transactional work and the
//! principal, access mode and recovery mode all match exactly.

use std::fmt;

/// What the last acquired thread was opened for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationKind {
    /// Ordinary transactional work; eligible for reuse.
    Transactional,
    /// Stateful, one-shot work; never reused. Also the cleared state.
    #[default]
    Stateful,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly = 1,
    ReadWrite = 2,
    Exclusive = 3,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    None = 0,
    Deferred = 1,
    Full = 2,
}

/// String attributes recorded alongside the decision keys.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ResourceProperties {
    pub database: String,
    pub schema: String,
    pub locale: String,
    pub version: String,
}

/// Attributes of a freshly acquired database thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReuseRecord {
    pub kind: OperationKind,
    pub identity: String,
    pub access: AccessMode,
    pub recovery: RecoveryMode,
    pub properties: ResourceProperties,
}

/// The keys a new client request is compared on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReuseRequest {
    pub identity: String,
    pub access: AccessMode,
    pub recovery: RecoveryMode,
}

impl ReuseRequest {
    pub fn new(identity: impl Into<String>, access: AccessMode, recovery: RecoveryMode) -> Self {
        Self {
            identity: identity.into(),
            access,
            recovery,
        }
    }
}

/// What the caller should do with the worker's current thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReuseDecision {
    Reuse,
    /// Attributes differ (or the cache is clear): acquire a new thread.
    Acquire,
    /// Attributes match but the consecutive-reuse cap was hit.
    LimitReached,
}

/// Last-acquired thread attributes plus a consecutive-reuse counter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceReuseCache {
    record: Option<ReuseRecord>,
    reuse_count: u32,
}

impl ResourceReuseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when the recorded thread was opened for transactional work with
    /// exactly these keys.
    pub fn compare(&self, identity: &str, access: AccessMode, recovery: RecoveryMode) -> bool {
        match &self.record {
            Some(record) => {
                record.kind == OperationKind::Transactional
                    && record.identity == identity
                    && record.access == access
                    && record.recovery == recovery
            }
            None => false,
        }
    }

    /// Record a freshly acquired thread and reset the reuse counter.
    pub fn save(&mut self, record: ReuseRecord) {
        self.record = Some(record);
        self.reuse_count = 0;
    }

    /// Forget the recorded thread. The next comparison always fails.
    pub fn invalidate(&mut self) {
        self.record = None;
        self.reuse_count = 0;
    }

    pub fn note_reuse(&mut self) {
        self.reuse_count = self.reuse_count.saturating_add(1);
    }

    pub fn reuse_count(&self) -> u32 {
        self.reuse_count
    }

    /// A `limit` of zero disables reuse entirely.
    pub fn limit_reached(&self, limit: u32) -> bool {
        self.reuse_count >= limit
    }

    /// Recorded operation kind; a cleared cache reports `Stateful`.
    pub fn kind(&self) -> OperationKind {
        self.record.as_ref().map(|r| r.kind).unwrap_or_default()
    }

    pub fn record(&self) -> Option<&ReuseRecord> {
        self.record.as_ref()
    }

    /// Compare, apply the reuse cap, and count the reuse when granted.
    pub fn decide(&mut self, request: &ReuseRequest, limit: u32) -> ReuseDecision {
        if !self.compare(&request.identity, request.access, request.recovery) {
            return ReuseDecision::Acquire;
        }
        if self.limit_reached(limit) {
            return ReuseDecision::LimitReached;
        }
        self.note_reuse();
        ReuseDecision::Reuse
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperationKind::Transactional => write!(f, "transactional"),
            OperationKind::Stateful => write!(f, "stateful"),
        }
    }
}

#[cfg(test)]
#[path = "reuse_tests.rs"]
mod tests;
