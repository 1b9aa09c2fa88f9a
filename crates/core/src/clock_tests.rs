// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    zero         = { 0,          "00:00:00.000" },
    millis       = { 42,         "00:00:00.042" },
    one_minute   = { 60_000,     "00:01:00.000" },
    mixed        = { 3_723_004,  "01:02:03.004" },
)]
fn timestamp_display(millis: u64, expected: &str) {
    assert_eq!(Timestamp(millis).to_string(), expected);
}

#[test]
fn fake_clock_advances() {
    let clock = FakeClock::new();
    assert_eq!(clock.now(), Timestamp(0));
    clock.advance(250);
    clock.advance(250);
    assert_eq!(clock.now(), Timestamp(500));
    clock.set(10);
    assert_eq!(clock.now(), Timestamp(10));
}

#[test]
fn elapsed_saturates() {
    assert_eq!(Timestamp(100).elapsed_until(Timestamp(350)), 250);
    assert_eq!(Timestamp(350).elapsed_until(Timestamp(100)), 0);
}

#[test]
fn system_clock_is_monotonic() {
    let clock = SystemClock::new();
    let a = clock.now();
    let b = clock.now();
    assert!(b >= a);
}
