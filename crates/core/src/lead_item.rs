// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Security lead-item snapshot and its double buffer.
//!
//! Permission checks read the snapshot on every client connection, so reads
//! must never wait for a refresh and must never see a half-written record.
//! [`LeadItemBuffer`] keeps two slots and an atomic index naming the current
//! one. The refresher writes the other slot and then publishes it by storing
//! the index with release ordering; readers load the index with acquire
//! ordering and only touch the slot it names.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;

/// Fixed-format directory resource name: `QUALIFIER*NAME`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceName {
    pub qualifier: String,
    pub name: String,
}

impl ResourceName {
    pub fn new(qualifier: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            qualifier: qualifier.into().to_ascii_uppercase(),
            name: name.into().to_ascii_uppercase(),
        }
    }

    /// Parse `QUALIFIER*NAME`. Both parts must be non-empty and alphanumeric
    /// (plus `$`, `-` and `_`).
    pub fn parse(text: &str) -> Option<Self> {
        let (qualifier, name) = text.trim().split_once('*')?;
        let valid = |part: &str| {
            !part.is_empty()
                && part.len() <= 12
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '$' | '-' | '_'))
        };
        (valid(qualifier) && valid(name)).then(|| Self::new(qualifier, name))
    }
}

impl fmt::Display for ResourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}*{}", self.qualifier, self.name)
    }
}

/// Status code returned by the directory service. Zero is success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct LookupStatus(pub i32);

impl LookupStatus {
    pub const OK: LookupStatus = LookupStatus(0);
    /// Resource not present in the directory.
    pub const NOT_FOUND: LookupStatus = LookupStatus(2);
    /// Directory entry exists but could not be read or decoded.
    pub const UNREADABLE: LookupStatus = LookupStatus(5);
    /// No refresh has completed yet.
    pub const PENDING: LookupStatus = LookupStatus(-1);

    pub fn is_ok(self) -> bool {
        self == Self::OK
    }
}

impl fmt::Display for LookupStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Access-control metadata of the security lead item.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LeadItemRecord {
    pub owner: String,
    /// Principals allowed to connect.
    #[serde(default)]
    pub principals: Vec<String>,
    /// Directory-assigned version, bumped on every change.
    #[serde(default)]
    pub version: u64,
}

/// What a directory lookup returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupResult {
    pub record: Option<LeadItemRecord>,
    pub status: LookupStatus,
}

impl LookupResult {
    pub fn found(record: LeadItemRecord) -> Self {
        Self {
            record: Some(record),
            status: LookupStatus::OK,
        }
    }

    pub fn failed(status: LookupStatus) -> Self {
        Self {
            record: None,
            status,
        }
    }
}

/// One complete, published refresh result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadItemSnapshot {
    pub record: Option<LeadItemRecord>,
    pub status: LookupStatus,
    pub refreshed_at: Option<Timestamp>,
    /// Monotonic refresh counter (0 = never refreshed).
    pub generation: u64,
}

impl LeadItemSnapshot {
    pub fn pending() -> Self {
        Self {
            record: None,
            status: LookupStatus::PENDING,
            refreshed_at: None,
            generation: 0,
        }
    }
}

/// Directory service consulted by the refresher. Failures are status codes.
pub trait DirectoryLookup: Send + Sync {
    fn lookup(&self, resource: &ResourceName) -> LookupResult;
}

/// Outcome of a permission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny,
}

/// Permission service consulted by connection admission.
pub trait PermissionValidator: Send + Sync {
    fn validate(&self, principal: &str, snapshot: &LeadItemSnapshot) -> Access;
}

/// Allows principals listed in a successfully refreshed lead item. The
/// owner is always allowed. Without a good snapshot, everyone is denied.
#[derive(Debug, Clone, Copy, Default)]
pub struct SnapshotPermissions;

impl PermissionValidator for SnapshotPermissions {
    fn validate(&self, principal: &str, snapshot: &LeadItemSnapshot) -> Access {
        let Some(record) = snapshot.record.as_ref().filter(|_| snapshot.status.is_ok()) else {
            return Access::Deny;
        };
        let listed = record.owner.eq_ignore_ascii_case(principal)
            || record
                .principals
                .iter()
                .any(|p| p.eq_ignore_ascii_case(principal));
        if listed {
            Access::Allow
        } else {
            Access::Deny
        }
    }
}

/// Two-slot buffer with an atomically published current index.
pub struct LeadItemBuffer {
    slots: [RwLock<Arc<LeadItemSnapshot>>; 2],
    current: AtomicUsize,
    /// Serializes publishers so only one ever writes the spare slot.
    publish: Mutex<()>,
}

impl LeadItemBuffer {
    pub fn new() -> Self {
        let pending = Arc::new(LeadItemSnapshot::pending());
        Self {
            slots: [RwLock::new(Arc::clone(&pending)), RwLock::new(pending)],
            current: AtomicUsize::new(0),
            publish: Mutex::new(()),
        }
    }

    /// The snapshot named by the current index at the moment of the call.
    pub fn current(&self) -> Arc<LeadItemSnapshot> {
        let index = self.current.load(Ordering::Acquire);
        Arc::clone(&self.slots[index].read())
    }

    /// Index of the slot readers currently see.
    pub fn current_index(&self) -> usize {
        self.current.load(Ordering::Acquire)
    }

    /// Write `snapshot` into the spare slot, then publish it. Returns the
    /// snapshot it replaced.
    pub fn publish(&self, snapshot: LeadItemSnapshot) -> Arc<LeadItemSnapshot> {
        let _publisher = self.publish.lock();
        let current = self.current.load(Ordering::Acquire);
        let spare = 1 - current;
        *self.slots[spare].write() = Arc::new(snapshot);
        self.current.store(spare, Ordering::Release);
        Arc::clone(&self.slots[current].read())
    }
}

impl Default for LeadItemBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "lead_item_tests.rs"]
mod tests;
