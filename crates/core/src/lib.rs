// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! dbsrv-core: worker registry, configuration and caches of the dbsrv server

pub mod clock;
pub mod config;
pub mod config_value;
pub mod lead_item;
pub mod registry;
pub mod reuse;
pub mod time_fmt;
pub mod worker;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock, Timestamp};
pub use config::{
    ConfigError, ConfigFile, ConfigParam, ConfigPart, ParamKind, ParamScope, ParamUpdate,
    ServerConfig,
};
pub use config_value::{Severity, UpdateMode, Validation};
pub use lead_item::{
    Access, DirectoryLookup, LeadItemBuffer, LeadItemRecord, LeadItemSnapshot, LookupResult,
    LookupStatus, PermissionValidator, ResourceName, SnapshotPermissions,
};
pub use registry::{
    AssignedSlots, LookupError, RegistryError, ShutdownSummary, SlotIndex, WorkerCounts,
    WorkerRegistry,
};
pub use reuse::{
    AccessMode, OperationKind, RecoveryMode, ResourceProperties, ResourceReuseCache,
    ReuseDecision, ReuseRecord, ReuseRequest,
};
pub use time_fmt::{format_idle, format_uptime};
pub use worker::{
    ConnectionHandle, ConnectionId, SecondaryKey, ShutdownState, TraceBinding, TraceHandle,
    WorkerSettings, WorkerSlot, WorkerState,
};
