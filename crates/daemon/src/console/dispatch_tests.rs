// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use dbsrv_core::{ConnectionHandle, ConnectionId, SecondaryKey};

use super::{dispatch, Origin};
use crate::server::{ServerContext, ServerCounts};
use crate::test_helpers::{allow, running_server};

fn run(ctx: &ServerContext, line: &str) -> Vec<String> {
    let mut origin = Origin::new();
    dispatch(ctx, line, &mut origin);
    origin.replies().to_vec()
}

#[yare::parameterized(
    status        = { "DISPLAY SERVER STATUS" },
    to_log        = { "DISPLAY SERVER STATUS TO LOG" },
    log_only      = { "DISPLAY SERVER LEVEL TO LOG ONLY" },
    set           = { "SET MAX ACTIVITIES=1" },
    set_invalid   = { "SET MAX ACTIVITIES=0" },
    client_miss   = { "SET CLIENT 3 DEBUG=1" },
    clear         = { "CLEAR SERVER COUNTS" },
    help          = { "help" },
    unknown_verb  = { "FROB" },
    empty         = { "   " },
    trailing      = { "DISPLAY FILENAMES NOW" },
)]
fn exactly_one_reply(line: &str) {
    let server = running_server(2);
    let replies = run(&server.ctx, line);
    assert_eq!(replies.len(), 1, "{line}: {replies:?}");
}

#[test]
fn syntax_errors_are_reported_not_executed() {
    let server = running_server(2);
    let replies = run(&server.ctx, "CLEAR SERVER COUNTS PLEASE");
    assert_eq!(
        replies,
        vec!["Syntax error: unexpected trailing input: PLEASE".to_string()]
    );
}

#[test]
fn display_to_log_writes_both() {
    let server = running_server(2);
    let replies = run(&server.ctx, "DISPLAY FILENAMES TO LOG");
    let expected = "Log file          console.log\nTrace file        trace.log";
    assert_eq!(replies, vec![expected.to_string()]);
    assert_eq!(server.sink.log_blocks(), vec![expected.to_string()]);
}

#[test]
fn display_to_log_only_acknowledges() {
    let server = running_server(2);
    let replies = run(&server.ctx, "DISPLAY FILENAMES TO LOG ONLY");
    assert_eq!(replies, vec!["Display written to log".to_string()]);
    assert_eq!(server.sink.log_blocks().len(), 1);
}

#[test]
fn clear_server_counts_is_idempotent() {
    let server = running_server(2);
    allow(&server.ctx, &["alice"]);
    let index = server
        .ctx
        .admit(
            "alice",
            ConnectionHandle::new(ConnectionId(4), 0x44),
            SecondaryKey::new("RUNC0003"),
        )
        .unwrap();
    server.ctx.note_request(index).unwrap();
    assert_eq!(server.ctx.counts.lock().requests, 1);

    for _ in 0..2 {
        assert_eq!(
            run(&server.ctx, "CLEAR SERVER COUNTS"),
            vec!["Server counts cleared".to_string()]
        );
        assert_eq!(*server.ctx.counts.lock(), ServerCounts::default());
    }
    // Worker counters are untouched.
    let slot = server.ctx.registry.snapshot(index).unwrap();
    assert_eq!(slot.request_count, 1);
}

#[test]
fn console_output_is_echoed_once_enabled() {
    let server = running_server(2);
    run(&server.ctx, "DISPLAY FILENAMES");
    assert!(server.sink.log_blocks().is_empty());

    run(&server.ctx, "SET LOG CONSOLE OUTPUT=ON");
    run(&server.ctx, "SET CLIENT 8 DEBUG=1");

    assert_eq!(
        server.sink.log_blocks(),
        vec![
            "> SET LOG CONSOLE OUTPUT=ON\nLOG CONSOLE OUTPUT changed from OFF to ON".to_string(),
            "> SET CLIENT 8 DEBUG=1\nConnection id 8 not found".to_string(),
        ]
    );
}

#[test]
fn echo_does_not_repeat_a_display_already_logged() {
    let server = running_server(2);
    run(&server.ctx, "SET LOG CONSOLE OUTPUT=ON");
    let replies = run(&server.ctx, "DISPLAY FILENAMES TO LOG");
    let display = "Log file          console.log\nTrace file        trace.log";
    assert_eq!(replies, vec![display.to_string()]);

    let blocks = server.sink.log_blocks();
    assert_eq!(
        blocks[1..],
        [display.to_string(), "> DISPLAY FILENAMES TO LOG".to_string()]
    );
    let logged = blocks.concat();
    assert_eq!(logged.matches("Trace file").count(), 1, "{logged}");
}

#[test]
fn echo_of_log_only_display_carries_the_acknowledgement() {
    let server = running_server(2);
    run(&server.ctx, "SET LOG CONSOLE OUTPUT=ON");
    run(&server.ctx, "DISPLAY FILENAMES TO LOG ONLY");

    let blocks = server.sink.log_blocks();
    assert_eq!(
        blocks[1..],
        [
            "Log file          console.log\nTrace file        trace.log".to_string(),
            "> DISPLAY FILENAMES TO LOG ONLY\nDisplay written to log".to_string(),
        ]
    );
}

#[test]
fn help_lists_build_variant_commands() {
    let server = running_server(1);
    let help = run(&server.ctx, "HELP").join("\n");
    assert!(help.starts_with("Console commands:"));
    assert!(help.contains("CLEAR SERVER COUNTS"));
    assert_eq!(
        help.contains("DISPLAY LEAD ITEM"),
        cfg!(feature = "dev-commands")
    );
}
