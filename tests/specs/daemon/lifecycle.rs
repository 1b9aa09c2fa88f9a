//! Daemon lifecycle specs
//!
//! Verify daemon start/stop/status and the shutdown request path.

use crate::prelude::*;

#[test]
fn status_without_daemon_reports_not_running() {
    let server = Server::new();
    server
        .dbsrv()
        .args(&["daemon", "status"])
        .succeeds()
        .stdout_is("Daemon not running\n");
}

#[test]
fn start_then_status_shows_server() {
    let server = Server::new();
    server.start().stdout_contains("Daemon started");

    server
        .dbsrv()
        .args(&["daemon", "status"])
        .succeeds()
        .stdout_contains("Status: running")
        .stdout_contains("Server DBSRV status: RUNNING")
        .stdout_contains("16 slots");
}

#[test]
fn start_twice_is_idempotent() {
    let server = Server::new();
    server.start();
    server.start().stdout_contains("Daemon already running");
}

#[test]
fn stop_removes_socket_and_pid() {
    let server = Server::new();
    server.start();
    assert!(server.has_file("daemon.sock"));

    server
        .dbsrv()
        .args(&["daemon", "stop"])
        .succeeds()
        .stdout_contains("Daemon stopped");
    assert!(server.stopped(), "daemon files left behind\n{}", server.daemon_log());
}

#[test]
fn stop_without_daemon_is_not_an_error() {
    let server = Server::new();
    server
        .dbsrv()
        .args(&["daemon", "stop"])
        .succeeds()
        .stdout_contains("Daemon not running");
}

#[test]
fn restart_brings_up_a_fresh_daemon() {
    let server = Server::new();
    server.start();
    server.console("SET MAX ACTIVITIES=2");

    server
        .dbsrv()
        .args(&["daemon", "restart", "--immediate"])
        .succeeds()
        .stdout_contains("Daemon restarted");
    server
        .console("SET MAX ACTIVITIES=3")
        .stdout_is("MAX ACTIVITIES changed from 16 to 3\n");
}

#[test]
fn ping_answers_pong() {
    let server = Server::new();
    server.start();
    server.dbsrv().args(&["ping"]).succeeds().stdout_is("pong\n");
}

#[test]
fn shutdown_request_stops_daemon() {
    let server = Server::new();
    server.start();
    server
        .dbsrv()
        .args(&["shutdown", "--immediate"])
        .succeeds()
        .stdout_is("Shutdown requested (immediate)\n");
    assert!(server.stopped(), "daemon still listening\n{}", server.daemon_log());
}

#[test]
fn config_file_sets_server_name_and_slots() {
    let server = Server::configured(
        r#"
server_name = "PAYROLL"
worker_slots = 4
"#,
    );
    server.start();
    server
        .console("DISPLAY SERVER STATUS")
        .stdout_contains("Server PAYROLL status: RUNNING")
        .stdout_contains("4 slots");
}
