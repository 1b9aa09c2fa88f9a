//! dbsrvd help and version specs

use crate::prelude::*;

#[test]
fn version_flag_prints_version() {
    let output = dbsrvd().arg("--version").output().unwrap();
    assert!(output.status.success());
    Outcome::from(output).stdout_contains("dbsrvd 0.1.0+");
}

#[test]
fn help_flag_prints_usage() {
    let output = dbsrvd().arg("--help").output().unwrap();
    assert!(output.status.success());
    Outcome::from(output)
        .stdout_contains("USAGE:")
        .stdout_contains("dbsrv");
}

#[test]
fn unknown_argument_fails() {
    let output = dbsrvd().arg("--bogus").output().unwrap();
    assert!(!output.status.success());
    Outcome::from(output).stderr_contains("unexpected argument '--bogus'");
}
