// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use dbsrv_daemon::StopMode;

use super::{format_error, Cli, Commands};
use crate::commands::daemon::DaemonCommand;
use crate::output::OutputFormat;

#[test]
fn console_words_are_joined() {
    let cli = Cli::try_parse_from(["dbsrv", "console", "SET", "MAX", "ACTIVITIES=4"]).unwrap();
    match cli.command {
        Some(Commands::Console(args)) => assert_eq!(args.line(), "SET MAX ACTIVITIES=4"),
        _ => panic!("expected console command"),
    }
}

#[test]
fn console_requires_a_command() {
    assert!(Cli::try_parse_from(["dbsrv", "console"]).is_err());
}

#[test]
fn console_keeps_client_star() {
    let cli = Cli::try_parse_from(["dbsrv", "console", "SET", "CLIENT", "*", "DEBUG=3"]).unwrap();
    match cli.command {
        Some(Commands::Console(args)) => assert_eq!(args.line(), "SET CLIENT * DEBUG=3"),
        _ => panic!("expected console command"),
    }
}

#[test]
fn output_flag_is_global() {
    let cli = Cli::try_parse_from(["dbsrv", "-o", "json", "console", "HELP"]).unwrap();
    assert_eq!(cli.output, OutputFormat::Json);
}

#[yare::parameterized(
    graceful  = { &["dbsrv", "shutdown"], StopMode::Graceful },
    immediate = { &["dbsrv", "shutdown", "--immediate"], StopMode::Immediate },
)]
fn shutdown_mode(args: &[&str], expected: StopMode) {
    let cli = Cli::try_parse_from(args).unwrap();
    match cli.command {
        Some(Commands::Shutdown(shutdown)) => assert_eq!(shutdown.mode(), expected),
        _ => panic!("expected shutdown command"),
    }
}

#[yare::parameterized(
    stop_graceful     = { &["dbsrv", "daemon", "stop"], StopMode::Graceful },
    stop_immediate    = { &["dbsrv", "daemon", "stop", "--immediate"], StopMode::Immediate },
    restart_immediate = { &["dbsrv", "daemon", "restart", "--immediate"], StopMode::Immediate },
)]
fn daemon_stop_modes(args: &[&str], expected: StopMode) {
    let cli = Cli::try_parse_from(args).unwrap();
    let Some(Commands::Daemon(daemon)) = cli.command else {
        panic!("expected daemon command");
    };
    match daemon.command {
        Some(DaemonCommand::Stop(shutdown) | DaemonCommand::Restart(shutdown)) => {
            assert_eq!(shutdown.mode(), expected)
        }
        _ => panic!("expected stop or restart"),
    }
}

#[test]
fn format_error_skips_redundant_chain() {
    let io = std::io::Error::other("socket gone");
    let err = anyhow::Error::new(io).context("Failed to connect: socket gone");
    assert_eq!(format_error(&err), "Failed to connect: socket gone");
}

#[test]
fn format_error_renders_distinct_causes() {
    let io = std::io::Error::other("socket gone");
    let err = anyhow::Error::new(io).context("Failed to connect");
    assert_eq!(
        format_error(&err),
        "Failed to connect\n\nCaused by:\n    0: socket gone"
    );
}
