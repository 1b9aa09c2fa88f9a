// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `dbsrv console` - Send an operator command to the running server

use anyhow::Result;
use clap::Args;

use crate::client::DaemonClient;
use crate::output::{print_lines, OutputFormat};

#[derive(Args)]
pub struct ConsoleArgs {
    /// Console command, e.g. `DISPLAY SERVER STATUS`
    #[arg(required = true, trailing_var_arg = true)]
    pub words: Vec<String>,
}

impl ConsoleArgs {
    /// The command line as the server will parse it.
    pub fn line(&self) -> String {
        self.words.join(" ")
    }
}

pub async fn console(args: ConsoleArgs, format: OutputFormat) -> Result<()> {
    let line = args.line();
    let client = DaemonClient::connect_or_start().await?;
    let lines = client.console(&line).await?;
    print_lines(&line, &lines, format)
}
