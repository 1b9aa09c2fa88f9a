// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Duration formatting for console displays.

/// Format milliseconds as an uptime: `"00:00:05"`, `"01:02:03"`, `"3d 04:05:06"`.
pub fn format_uptime(ms: u64) -> String {
    let secs = ms / 1000;
    let days = secs / 86_400;
    let clock = format!(
        "{:02}:{:02}:{:02}",
        (secs % 86_400) / 3600,
        (secs % 3600) / 60,
        secs % 60
    );
    if days > 0 {
        format!("{days}d {clock}")
    } else {
        clock
    }
}

/// Format milliseconds as a short idle time: `"5s"`, `"2m"`, `"1h30m"`, `"3d"`.
///
/// Minutes are kept in the hours range when non-zero.
pub fn format_idle(ms: u64) -> String {
    let secs = ms / 1000;
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86_400 {
        match (secs / 3600, (secs % 3600) / 60) {
            (h, 0) => format!("{h}h"),
            (h, m) => format!("{h}h{m}m"),
        }
    } else {
        format!("{}d", secs / 86_400)
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
