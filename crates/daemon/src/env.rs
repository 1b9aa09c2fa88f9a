// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;

use crate::lifecycle::LifecycleError;

/// Resolve state directory:
/// DBSRV_STATE_DIR > XDG_STATE_HOME/dbsrv > platform state dir > ~/.local/state/dbsrv
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = non_empty_var("DBSRV_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty_var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("dbsrv"));
    }
    if let Some(dir) = dirs::state_dir() {
        return Ok(dir.join("dbsrv"));
    }
    let home = non_empty_var("HOME").ok_or(LifecycleError::NoStateDir)?;
    Ok(PathBuf::from(home).join(".local/state/dbsrv"))
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
