// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI command implementations

pub mod console;
pub mod daemon;

use clap::Args;
use dbsrv_daemon::StopMode;

/// Shutdown options shared by `shutdown`, `daemon stop` and `daemon restart`.
#[derive(Args, Debug, Clone, Copy)]
pub struct ShutdownArgs {
    /// Down workers without waiting for their current call
    #[arg(long)]
    pub immediate: bool,
}

impl ShutdownArgs {
    pub fn mode(self) -> StopMode {
        StopMode::from_immediate_flag(self.immediate)
    }
}
