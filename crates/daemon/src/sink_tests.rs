// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn file_sink(dir: &Path) -> FileSink {
    FileSink::open(dir, &dir.join("traces"), "console.log").unwrap()
}

#[test]
fn destination_mask() {
    let both = Destinations::LOG | Destinations::STDOUT;
    assert!(both.contains(Destinations::LOG));
    assert!(both.contains(Destinations::STDOUT));
    assert!(!Destinations::LOG.contains(Destinations::STDOUT));
}

#[test]
fn log_blocks_end_with_one_newline() {
    let dir = tempfile::tempdir().unwrap();
    let sink = file_sink(dir.path());
    sink.append(Destinations::LOG, "first\nblock\n\n").unwrap();
    sink.append(Destinations::LOG, "second").unwrap();

    let content = std::fs::read_to_string(dir.path().join("console.log")).unwrap();
    assert_eq!(content, "first\nblock\nsecond\n");
}

#[test]
fn switch_log_moves_later_appends() {
    let dir = tempfile::tempdir().unwrap();
    let sink = file_sink(dir.path());
    sink.append(Destinations::LOG, "before").unwrap();
    sink.switch_log("foo").unwrap();
    sink.append(Destinations::LOG, "after").unwrap();

    assert_eq!(sink.log_name(), "foo");
    let old = std::fs::read_to_string(dir.path().join("console.log")).unwrap();
    let new = std::fs::read_to_string(dir.path().join("foo")).unwrap();
    assert_eq!(old, "before\n");
    assert_eq!(new, "after\n");
}

#[test]
fn failed_switch_keeps_current_log() {
    let dir = tempfile::tempdir().unwrap();
    let sink = file_sink(dir.path());
    std::fs::create_dir(dir.path().join("taken")).unwrap();
    let err = sink.switch_log("taken").unwrap_err();
    assert!(matches!(err, SinkError::Open { .. }), "{err}");
    assert_eq!(sink.log_name(), "console.log");
}

#[test]
fn trace_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let sink = file_sink(dir.path());
    let handle = sink.open_trace("w1.trc").unwrap();
    sink.append_trace(handle, "request 1").unwrap();
    sink.close_trace(handle).unwrap();

    let content = std::fs::read_to_string(dir.path().join("traces/w1.trc")).unwrap();
    assert_eq!(content, "request 1\n");
    assert!(matches!(
        sink.append_trace(handle, "late"),
        Err(SinkError::UnknownTrace(h)) if h == handle
    ));
    assert!(sink.close_trace(handle).is_err());
}

#[test]
fn trace_handles_are_distinct() {
    let dir = tempfile::tempdir().unwrap();
    let sink = file_sink(dir.path());
    let a = sink.open_trace("a.trc").unwrap();
    let b = sink.open_trace("b.trc").unwrap();
    assert_ne!(a, b);
}

#[test]
fn memory_sink_records_in_order() {
    let sink = MemorySink::new("console.log");
    sink.append(Destinations::LOG | Destinations::STDOUT, "hi").unwrap();
    let trace = sink.open_trace("t").unwrap();
    sink.close_trace(trace).unwrap();
    assert_eq!(
        sink.events(),
        vec![
            SinkEvent::Log("hi".to_string()),
            SinkEvent::Stdout("hi".to_string()),
            SinkEvent::OpenTrace {
                handle: trace,
                name: "t".to_string()
            },
            SinkEvent::CloseTrace(trace),
        ]
    );
    assert!(sink.open_traces().is_empty());
}

#[test]
fn memory_sink_refuses_named_files() {
    let sink = MemorySink::new("console.log");
    sink.refuse("locked.log");
    assert!(sink.switch_log("locked.log").is_err());
    assert!(sink.open_trace("locked.log").is_err());
    assert_eq!(sink.log_name(), "console.log");
}

#[yare::parameterized(
    parent    = { "../escaped.log" },
    nested    = { "sub/inner.log" },
    absolute  = { "/tmp/escaped.log" },
    dot       = { "." },
    dot_dot   = { ".." },
    empty     = { "" },
)]
fn names_outside_the_base_directory_are_refused(name: &str) {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("state");
    std::fs::create_dir(&base).unwrap();
    let sink = file_sink(&base);

    assert!(matches!(
        sink.switch_log(name),
        Err(SinkError::NotAFileName(n)) if n == name
    ));
    assert!(matches!(sink.open_trace(name), Err(SinkError::NotAFileName(_))));
    assert_eq!(sink.log_name(), "console.log");
    assert!(!dir.path().join("escaped.log").exists());
}

#[test]
fn memory_sink_collects_trace_text_per_handle() {
    let sink = MemorySink::new("console.log");
    let a = sink.open_trace("a.trc").unwrap();
    let b = sink.open_trace("b.trc").unwrap();
    sink.append_trace(a, "one").unwrap();
    sink.append_trace(b, "other").unwrap();
    sink.append_trace(a, "two").unwrap();

    assert_eq!(sink.trace_lines(a), vec!["one".to_string(), "two".to_string()]);
    assert_eq!(sink.trace_lines(b), vec!["other".to_string()]);
}
