//! Black-box harness: run the built `dbsrv`/`dbsrvd` binaries against a
//! throwaway state directory and assert on what they print.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::{Duration, Instant};

/// Short client timeouts so a broken daemon fails a test quickly.
const CLIENT_TIMEOUTS: [(&str, &str); 4] = [
    ("DBSRV_TIMEOUT_CONNECT_MS", "2000"),
    ("DBSRV_TIMEOUT_EXIT_MS", "500"),
    ("DBSRV_TIMEOUT_IPC_MS", "500"),
    ("DBSRV_CONNECT_POLL_MS", "5"),
];

const SETTLE: Duration = Duration::from_secs(2);

/// Directory holding the built binaries. The test executable sits in
/// `target/<profile>/deps/`, one level below them.
fn bin_dir() -> PathBuf {
    let exe = std::env::current_exe().unwrap();
    exe.parent()
        .and_then(Path::parent)
        .map(Path::to_path_buf)
        .unwrap()
}

/// The daemon binary, run directly.
pub fn dbsrvd() -> Command {
    Command::new(bin_dir().join("dbsrvd"))
}

/// A `dbsrv` run that is not tied to any server's state directory.
pub fn cli() -> Invocation {
    let mut command = Command::new(bin_dir().join("dbsrv"));
    // A developer's own daemon must never answer a test.
    command
        .env_remove("DBSRV_STATE_DIR")
        .env("DBSRV_DAEMON_BINARY", bin_dir().join("dbsrvd"))
        .envs(CLIENT_TIMEOUTS);
    Invocation { command }
}

pub struct Invocation {
    command: Command,
}

impl Invocation {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.command.args(args);
        self
    }

    fn output(mut self) -> Output {
        self.command.output().unwrap()
    }

    fn in_state_dir(mut self, dir: &Path) -> Self {
        self.command.env("DBSRV_STATE_DIR", dir);
        self
    }

    pub fn succeeds(self) -> Outcome {
        let outcome = Outcome::from(self.output());
        assert!(
            outcome.output.status.success(),
            "expected success, got {:?}\n{outcome}",
            outcome.output.status.code()
        );
        outcome
    }

    pub fn fails(self) -> Outcome {
        let outcome = Outcome::from(self.output());
        assert!(!outcome.output.status.success(), "expected failure\n{outcome}");
        outcome
    }
}

/// Captured output of one finished process.
pub struct Outcome {
    output: Output,
}

impl From<Output> for Outcome {
    fn from(output: Output) -> Self {
        Self { output }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "stdout:\n{}\nstderr:\n{}", self.stdout(), self.stderr())
    }
}

impl Outcome {
    pub fn succeeded(&self) -> bool {
        self.output.status.success()
    }

    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    /// Exact stdout, diffed on mismatch. Use for reply formats.
    pub fn stdout_is(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    pub fn stdout_contains(self, expected: &str) -> Self {
        assert!(self.stdout().contains(expected), "no {expected:?} in\n{self}");
        self
    }

    pub fn stderr_contains(self, expected: &str) -> Self {
        assert!(self.stderr().contains(expected), "no {expected:?} in\n{self}");
        self
    }
}

/// Poll `condition` until it holds or a couple of seconds pass.
pub fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + SETTLE;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    condition()
}

/// A database server with its own state directory. Dropping it stops any
/// daemon the test started.
pub struct Server {
    dir: tempfile::TempDir,
}

impl Server {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    /// A server whose `server.toml` holds `toml`.
    pub fn configured(toml: &str) -> Self {
        let server = Self::new();
        std::fs::write(server.path("server.toml"), toml).unwrap();
        server
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn has_file(&self, name: &str) -> bool {
        self.path(name).exists()
    }

    /// Contents of a file in the state directory, empty if missing.
    pub fn read(&self, name: &str) -> String {
        std::fs::read_to_string(self.path(name)).unwrap_or_default()
    }

    pub fn daemon_log(&self) -> String {
        self.read("daemon.log")
    }

    pub fn dbsrv(&self) -> Invocation {
        cli().in_state_dir(self.dir.path())
    }

    /// `dbsrv daemon start`, which must succeed.
    pub fn start(&self) -> Outcome {
        self.dbsrv().args(&["daemon", "start"]).succeeds()
    }

    /// `dbsrv console <command>`, which must succeed. Console errors are
    /// replies, so this holds for bad commands too.
    pub fn console(&self, command: &str) -> Outcome {
        let mut args = vec!["console"];
        args.extend(command.split_whitespace());
        self.dbsrv().args(&args).succeeds()
    }

    /// Wait for the daemon to remove its socket and pid file.
    pub fn stopped(&self) -> bool {
        eventually(|| !self.has_file("daemon.sock") && !self.has_file("daemon.pid"))
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let mut stop = self.dbsrv().args(&["daemon", "stop", "--immediate"]);
        stop.command.stdout(Stdio::null()).stderr(Stdio::null());
        let _ = stop.command.status();
    }
}
