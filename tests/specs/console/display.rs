//! Console DISPLAY specs

use crate::prelude::*;

#[test]
fn help_lists_console_commands() {
    let server = Server::new();
    server
        .console("HELP")
        .stdout_contains("Console commands:")
        .stdout_contains("CLEAR SERVER COUNTS");
}

#[test]
fn server_level_reports_protocol_version() {
    let server = Server::new();
    server
        .console("display server level")
        .stdout_contains("Server DBSRV level 0.1.0+");
}

#[test]
fn unknown_connection_id_is_reported() {
    let server = Server::new();
    server
        .console("DISPLAY WORKER 7")
        .stdout_is("Connection id 7 not found\n");
}

#[test]
fn idle_server_has_no_assigned_workers() {
    let server = Server::new();
    server
        .console("DISPLAY WORKER ALL")
        .stdout_is("No assigned workers\n");
}

#[test]
fn display_to_log_only_writes_console_log() {
    let server = Server::new();
    server
        .console("DISPLAY FILENAMES TO LOG ONLY")
        .stdout_is("Display written to log\n");
    assert!(server.read("console.log").contains("Log file"));
}

#[test]
fn syntax_errors_are_replies_not_failures() {
    let server = Server::new();
    server
        .console("DISPLAY SERVER STATUS PLEASE")
        .stdout_is("Syntax error: unexpected trailing input: PLEASE\n");
}

#[test]
fn json_output_carries_command_and_lines() {
    let server = Server::new();
    let out = server
        .dbsrv()
        .args(&["-o", "json", "console", "DISPLAY", "WORKER", "7"])
        .succeeds()
        .stdout();
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(value["command"], "DISPLAY WORKER 7");
    assert_eq!(value["lines"][0], "Connection id 7 not found");
}
