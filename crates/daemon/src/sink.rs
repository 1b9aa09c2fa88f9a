// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator output sinks: the console log, process stdout and per-worker
//! trace files.
//!
//! Every call is one append under the sink's lock, so blocks written by
//! concurrent callers never interleave.

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::ops::BitOr;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dbsrv_core::TraceHandle;
use parking_lot::Mutex;
use thiserror::Error;

/// Destination mask for [`OutputSink::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Destinations(u8);

impl Destinations {
    pub const LOG: Destinations = Destinations(0b01);
    pub const STDOUT: Destinations = Destinations(0b10);

    pub fn contains(self, other: Destinations) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Destinations {
    type Output = Destinations;

    fn bitor(self, rhs: Destinations) -> Destinations {
        Destinations(self.0 | rhs.0)
    }
}

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("cannot open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unknown trace handle {0:?}")]
    UnknownTrace(TraceHandle),

    #[error("{0:?} is not a plain file name")]
    NotAFileName(String),
}

pub trait OutputSink: Send + Sync {
    /// Append one block of text to every destination in `to`.
    fn append(&self, to: Destinations, text: &str) -> Result<(), SinkError>;

    /// Close the current log file and continue logging to `name`.
    fn switch_log(&self, name: &str) -> Result<(), SinkError>;

    /// Name of the log file currently written.
    fn log_name(&self) -> String;

    fn open_trace(&self, name: &str) -> Result<TraceHandle, SinkError>;

    fn close_trace(&self, handle: TraceHandle) -> Result<(), SinkError>;

    fn append_trace(&self, handle: TraceHandle, text: &str) -> Result<(), SinkError>;
}

/// Block text with exactly one trailing newline.
fn block(text: &str) -> String {
    let mut block = text.trim_end_matches('\n').to_string();
    block.push('\n');
    block
}

fn open_append(path: &Path) -> Result<File, SinkError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })
}

struct OpenFile {
    name: String,
    path: PathBuf,
    file: File,
}

impl OpenFile {
    /// Open `name` inside `dir`. Names that would resolve anywhere else are
    /// refused.
    fn open(name: &str, dir: &Path) -> Result<Self, SinkError> {
        let mut parts = Path::new(name).components();
        if !matches!((parts.next(), parts.next()), (Some(Component::Normal(_)), None)) {
            return Err(SinkError::NotAFileName(name.to_string()));
        }
        let path = dir.join(name);
        let file = open_append(&path)?;
        Ok(Self {
            name: name.to_string(),
            path,
            file,
        })
    }

    fn write(&mut self, text: &str) -> Result<(), SinkError> {
        self.file
            .write_all(block(text).as_bytes())
            .map_err(|source| SinkError::Write {
                path: self.path.clone(),
                source,
            })
    }
}

/// File-backed sink used by the daemon. Log names resolve in the state
/// directory, trace names in its `traces/` directory.
pub struct FileSink {
    log_dir: PathBuf,
    trace_dir: PathBuf,
    log: Mutex<OpenFile>,
    traces: Mutex<HashMap<TraceHandle, OpenFile>>,
    next_trace: AtomicU64,
}

impl FileSink {
    pub fn open(log_dir: &Path, trace_dir: &Path, log_name: &str) -> Result<Self, SinkError> {
        std::fs::create_dir_all(trace_dir).map_err(|source| SinkError::Open {
            path: trace_dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            log_dir: log_dir.to_path_buf(),
            trace_dir: trace_dir.to_path_buf(),
            log: Mutex::new(OpenFile::open(log_name, log_dir)?),
            traces: Mutex::new(HashMap::new()),
            next_trace: AtomicU64::new(1),
        })
    }
}

impl OutputSink for FileSink {
    fn append(&self, to: Destinations, text: &str) -> Result<(), SinkError> {
        if to.contains(Destinations::LOG) {
            self.log.lock().write(text)?;
        }
        if to.contains(Destinations::STDOUT) {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(block(text).as_bytes())
                .map_err(|source| SinkError::Write {
                    path: PathBuf::from("<stdout>"),
                    source,
                })?;
        }
        Ok(())
    }

    fn switch_log(&self, name: &str) -> Result<(), SinkError> {
        // Open first so a bad name leaves the current log in place.
        let next = OpenFile::open(name, &self.log_dir)?;
        let mut log = self.log.lock();
        tracing::info!(from = %log.name, to = %name, "switching operator log");
        *log = next;
        Ok(())
    }

    fn log_name(&self) -> String {
        self.log.lock().name.clone()
    }

    fn open_trace(&self, name: &str) -> Result<TraceHandle, SinkError> {
        let file = OpenFile::open(name, &self.trace_dir)?;
        let handle = TraceHandle(self.next_trace.fetch_add(1, Ordering::Relaxed));
        self.traces.lock().insert(handle, file);
        Ok(handle)
    }

    fn close_trace(&self, handle: TraceHandle) -> Result<(), SinkError> {
        self.traces
            .lock()
            .remove(&handle)
            .map(drop)
            .ok_or(SinkError::UnknownTrace(handle))
    }

    fn append_trace(&self, handle: TraceHandle, text: &str) -> Result<(), SinkError> {
        self.traces
            .lock()
            .get_mut(&handle)
            .ok_or(SinkError::UnknownTrace(handle))?
            .write(text)
    }
}

/// Everything a [`MemorySink`] was asked to do, in order.
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkEvent {
    Log(String),
    Stdout(String),
    SwitchLog(String),
    OpenTrace { handle: TraceHandle, name: String },
    CloseTrace(TraceHandle),
    Trace { handle: TraceHandle, text: String },
}

/// In-memory sink for tests.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySink {
    events: Mutex<Vec<SinkEvent>>,
    log_name: Mutex<String>,
    open: Mutex<HashMap<TraceHandle, String>>,
    unopenable: Mutex<Vec<String>>,
    next_trace: AtomicU64,
}

#[cfg(test)]
impl MemorySink {
    pub fn new(log_name: &str) -> Self {
        Self {
            log_name: Mutex::new(log_name.to_string()),
            next_trace: AtomicU64::new(1),
            ..Self::default()
        }
    }

    /// Make every later open of `name` fail.
    pub fn refuse(&self, name: &str) {
        self.unopenable.lock().push(name.to_string());
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().clone()
    }

    /// Blocks appended to the log, in order.
    pub fn log_blocks(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Log(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Text appended to one trace, in order.
    pub fn trace_lines(&self, handle: TraceHandle) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                SinkEvent::Trace { handle: h, text } if *h == handle => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of the traces currently open.
    pub fn open_traces(&self) -> Vec<String> {
        let mut names: Vec<_> = self.open.lock().values().cloned().collect();
        names.sort();
        names
    }

    fn check_openable(&self, name: &str) -> Result<(), SinkError> {
        if self.unopenable.lock().iter().any(|n| n == name) {
            return Err(SinkError::Open {
                path: PathBuf::from(name),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
impl OutputSink for MemorySink {
    fn append(&self, to: Destinations, text: &str) -> Result<(), SinkError> {
        let mut events = self.events.lock();
        if to.contains(Destinations::LOG) {
            events.push(SinkEvent::Log(text.to_string()));
        }
        if to.contains(Destinations::STDOUT) {
            events.push(SinkEvent::Stdout(text.to_string()));
        }
        Ok(())
    }

    fn switch_log(&self, name: &str) -> Result<(), SinkError> {
        self.check_openable(name)?;
        *self.log_name.lock() = name.to_string();
        self.events.lock().push(SinkEvent::SwitchLog(name.to_string()));
        Ok(())
    }

    fn log_name(&self) -> String {
        self.log_name.lock().clone()
    }

    fn open_trace(&self, name: &str) -> Result<TraceHandle, SinkError> {
        self.check_openable(name)?;
        let handle = TraceHandle(self.next_trace.fetch_add(1, Ordering::Relaxed));
        self.open.lock().insert(handle, name.to_string());
        self.events.lock().push(SinkEvent::OpenTrace {
            handle,
            name: name.to_string(),
        });
        Ok(handle)
    }

    fn close_trace(&self, handle: TraceHandle) -> Result<(), SinkError> {
        self.open
            .lock()
            .remove(&handle)
            .ok_or(SinkError::UnknownTrace(handle))?;
        self.events.lock().push(SinkEvent::CloseTrace(handle));
        Ok(())
    }

    fn append_trace(&self, handle: TraceHandle, text: &str) -> Result<(), SinkError> {
        if !self.open.lock().contains_key(&handle) {
            return Err(SinkError::UnknownTrace(handle));
        }
        self.events.lock().push(SinkEvent::Trace {
            handle,
            text: text.to_string(),
        });
        Ok(())
    }
}

#[cfg(test)]
#[path = "sink_tests.rs"]
mod tests;
