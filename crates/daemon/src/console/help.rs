// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `HELP` text.

const COMMANDS: &[&str] = &[
    "DISPLAY SERVER STATUS|LEVEL [TO LOG [ONLY]]",
    "DISPLAY WORKER <id>|* [TO LOG [ONLY]]",
    "DISPLAY WORKER KEY <key> [TO LOG [ONLY]]",
    "DISPLAY WORKER ALL [IN CALL] [TO LOG [ONLY]]",
    "DISPLAY WORKER SHORT [TO LOG [ONLY]]",
    "DISPLAY CONFIGURATION [ALL|PART 1|PART 2] [TO LOG [ONLY]]",
    "DISPLAY FILENAMES [TO LOG [ONLY]]",
    "SET [SERVER] <parameter>=<value>",
    "SET CLIENT <id>|* TRACE FILE=<file>",
    "SET CLIENT <id>|* DEBUG|RECEIVE TIMEOUT|FETCH BLOCK SIZE=<n>",
    "SET TRANSPORT MODE|KEEP ALIVE|BACKLOG=<value>",
    "SET LOG CONSOLE OUTPUT=ON|OFF",
    "CLEAR SERVER COUNTS",
    "HELP",
];

#[cfg(feature = "dev-commands")]
const DEV_COMMANDS: &[&str] = &[
    "DISPLAY LEAD ITEM [TO LOG [ONLY]]",
    "DISPLAY WORKER DUMP <id>|* [TO LOG [ONLY]]",
];

#[cfg(not(feature = "dev-commands"))]
const DEV_COMMANDS: &[&str] = &[];

pub(super) fn text() -> String {
    let mut out = String::from("Console commands:");
    for line in COMMANDS.iter().chain(DEV_COMMANDS) {
        out.push_str("\n  ");
        out.push_str(line);
    }
    out
}
