//! Console SET specs

use crate::prelude::*;

#[test]
fn set_is_visible_in_configuration() {
    let server = Server::new();
    server
        .console("SET MAX ACTIVITIES=2")
        .stdout_is("MAX ACTIVITIES changed from 16 to 2\n");
    server
        .console("DISPLAY CONFIGURATION")
        .stdout_contains("MAX ACTIVITIES")
        .stdout_contains("2");
}

#[test]
fn out_of_range_value_is_rejected() {
    let server = Server::new();
    server
        .console("SET MAX ACTIVITIES=999999")
        .stdout_contains("Invalid value 999999 for MAX ACTIVITIES; value not changed");
}

#[test]
fn log_file_switch_is_shown_in_filenames() {
    let server = Server::new();
    server
        .console("SET LOG FILE=ops.log")
        .stdout_is("LOG FILE changed from console.log to ops.log\n");
    server
        .console("DISPLAY FILENAMES")
        .stdout_contains("Log file          ops.log");
}

#[test]
fn set_client_without_workers_reports_not_found() {
    let server = Server::new();
    server
        .console("SET CLIENT 3 DEBUG=1")
        .stdout_is("Connection id 3 not found\n");
}
