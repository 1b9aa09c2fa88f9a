//! Daemon log specs

use crate::prelude::*;

#[test]
fn logs_without_log_file() {
    let server = Server::new();
    server
        .dbsrv()
        .args(&["daemon", "logs"])
        .succeeds()
        .stdout_contains("No log file found");
}

#[test]
fn daemon_log_starts_with_marker() {
    let server = Server::new();
    server.start();

    let log = server.daemon_log();
    assert!(
        log.contains("--- dbsrvd: starting (pid: "),
        "missing startup marker\n{}",
        log
    );
    server
        .dbsrv()
        .args(&["daemon", "logs", "--no-limit"])
        .succeeds()
        .stdout_contains("--- dbsrvd: starting");
}
