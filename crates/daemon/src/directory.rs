// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed directory service.
//!
//! Records live at `<root>/<QUALIFIER>/<NAME>.json`.

use std::path::{Path, PathBuf};

use dbsrv_core::{DirectoryLookup, LeadItemRecord, LookupResult, LookupStatus, ResourceName};
use tracing::debug;

pub struct FileDirectory {
    root: PathBuf,
}

impl FileDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, resource: &ResourceName) -> PathBuf {
        self.root
            .join(&resource.qualifier)
            .join(format!("{}.json", resource.name))
    }
}

impl DirectoryLookup for FileDirectory {
    fn lookup(&self, resource: &ResourceName) -> LookupResult {
        let path = self.record_path(resource);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return LookupResult::failed(LookupStatus::NOT_FOUND);
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "directory record unreadable");
                return LookupResult::failed(LookupStatus::UNREADABLE);
            }
        };
        match serde_json::from_str::<LeadItemRecord>(&text) {
            Ok(record) => LookupResult::found(record),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "directory record malformed");
                LookupResult::failed(LookupStatus::UNREADABLE)
            }
        }
    }
}

#[cfg(test)]
#[path = "directory_tests.rs"]
mod tests;
