//! CLI error specs

use crate::prelude::*;

#[test]
fn unknown_subcommand_fails() {
    cli().args(&["frobnicate"]).fails();
}

#[test]
fn console_without_words_fails() {
    cli().args(&["console"]).fails();
}

#[test]
fn ping_without_daemon_reports_not_running() {
    let server = Server::new();
    server
        .dbsrv()
        .args(&["ping"])
        .fails()
        .stderr_contains("Daemon not running");
}

#[test]
fn bad_config_file_fails_startup_with_reason() {
    let server = Server::configured(
        r#"
[parameters]
turbo = 11
"#,
    );
    server
        .dbsrv()
        .args(&["daemon", "start"])
        .fails()
        .stderr_contains("unknown configuration parameter");
}
