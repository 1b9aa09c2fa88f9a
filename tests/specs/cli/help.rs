//! CLI help specs

use crate::prelude::*;

#[test]
fn no_subcommand_prints_help() {
    cli()
        .succeeds()
        .stdout_contains("Usage: dbsrv")
        .stdout_contains("console")
        .stdout_contains("daemon");
}

#[test]
fn console_help_describes_command_words() {
    cli()
        .args(&["console", "--help"])
        .succeeds()
        .stdout_contains("DISPLAY SERVER STATUS");
}

#[test]
fn daemon_without_subcommand_prints_daemon_help() {
    cli()
        .args(&["daemon"])
        .succeeds()
        .stdout_contains("start")
        .stdout_contains("stop")
        .stdout_contains("status");
}
