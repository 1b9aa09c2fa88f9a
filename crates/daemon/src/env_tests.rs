// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serial_test::serial;

use super::*;

struct EnvGuard(Vec<(&'static str, Option<String>)>);

impl EnvGuard {
    fn set(vars: &[(&'static str, Option<&str>)]) -> Self {
        let saved = vars
            .iter()
            .map(|(name, _)| (*name, std::env::var(name).ok()))
            .collect();
        for (name, value) in vars {
            match value {
                Some(v) => std::env::set_var(name, v),
                None => std::env::remove_var(name),
            }
        }
        Self(saved)
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (name, value) in &self.0 {
            match value {
                Some(v) => std::env::set_var(name, v),
                None => std::env::remove_var(name),
            }
        }
    }
}

#[test]
#[serial]
fn explicit_state_dir_wins() {
    let _env = EnvGuard::set(&[
        ("DBSRV_STATE_DIR", Some("/tmp/dbsrv-explicit")),
        ("XDG_STATE_HOME", Some("/tmp/xdg")),
    ]);
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/dbsrv-explicit"));
}

#[test]
#[serial]
fn xdg_state_home_is_next() {
    let _env = EnvGuard::set(&[
        ("DBSRV_STATE_DIR", None),
        ("XDG_STATE_HOME", Some("/tmp/xdg")),
    ]);
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/xdg/dbsrv"));
}

#[test]
#[serial]
fn empty_values_are_ignored() {
    let _env = EnvGuard::set(&[
        ("DBSRV_STATE_DIR", Some("")),
        ("XDG_STATE_HOME", Some("/tmp/xdg")),
    ]);
    assert_eq!(state_dir().unwrap(), PathBuf::from("/tmp/xdg/dbsrv"));
}

#[test]
#[serial]
fn falls_back_to_a_dbsrv_directory() {
    let _env = EnvGuard::set(&[("DBSRV_STATE_DIR", None), ("XDG_STATE_HOME", None)]);
    if let Ok(dir) = state_dir() {
        assert!(dir.ends_with("dbsrv"), "{}", dir.display());
    }
}
