// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Validation and update of scalar and string configuration values.
//!
//! Every mutation of a server or worker parameter flows through one of the
//! `validate_*` functions. They share one contract:
//!
//! - [`Severity::Ok`]: the requested value is applied verbatim (update modes).
//! - [`Severity::Warning`]: the requested value was out of range but a default
//!   exists; the default is applied (in [`UpdateMode::UpdateAllowDefault`])
//!   and the caller must surface the substitution.
//! - [`Severity::Error`]: the value is rejected and the target is untouched.

use std::fmt;
use std::ops::RangeInclusive;

/// Outcome classification of a validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Ok,
    /// Value substituted with the parameter default.
    Warning,
    /// Value rejected, nothing changed.
    Error,
}

impl Severity {
    /// Numeric severity code: zero for OK, negative for warnings, positive
    /// for errors.
    pub fn code(self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => -1,
            Severity::Error => 1,
        }
    }

    pub fn is_error(self) -> bool {
        self == Severity::Error
    }
}

/// How a validator treats the target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    /// Check only; never write the target.
    ValidateOnly,
    /// Write the target when the value is in range.
    Update,
    /// Like `Update`, but an out-of-range value with a default available
    /// writes the default and reports a warning.
    UpdateAllowDefault,
}

impl UpdateMode {
    fn writes(self) -> bool {
        !matches!(self, UpdateMode::ValidateOnly)
    }
}

/// Result of a validation: the severity and the value that was (or, in
/// validate-only mode, would have been) applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation<T> {
    pub severity: Severity,
    /// `None` when the value was rejected.
    pub applied: Option<T>,
}

impl<T> Validation<T> {
    fn ok(value: T) -> Self {
        Self {
            severity: Severity::Ok,
            applied: Some(value),
        }
    }

    fn warning(value: T) -> Self {
        Self {
            severity: Severity::Warning,
            applied: Some(value),
        }
    }

    fn error() -> Self {
        Self {
            severity: Severity::Error,
            applied: None,
        }
    }

    pub fn accepted(&self) -> bool {
        !self.severity.is_error()
    }
}

/// Validate an integer against `bounds`, optionally substituting `default`.
pub fn validate_int(
    target: &mut i64,
    value: i64,
    mode: UpdateMode,
    bounds: &RangeInclusive<i64>,
    default: Option<i64>,
) -> Validation<i64> {
    let result = if bounds.contains(&value) {
        Validation::ok(value)
    } else {
        match (mode, default) {
            (UpdateMode::UpdateAllowDefault, Some(default)) => Validation::warning(default),
            _ => Validation::error(),
        }
    };

    if mode.writes() {
        if let Some(applied) = result.applied {
            *target = applied;
        }
    }
    result
}

/// Validate a string against a length range (in characters).
pub fn validate_str(
    target: &mut String,
    value: &str,
    mode: UpdateMode,
    length: &RangeInclusive<usize>,
    default: Option<&str>,
) -> Validation<String> {
    let result = if length.contains(&value.chars().count()) {
        Validation::ok(value.to_string())
    } else {
        match (mode, default) {
            (UpdateMode::UpdateAllowDefault, Some(default)) => {
                Validation::warning(default.to_string())
            }
            _ => Validation::error(),
        }
    };

    if mode.writes() {
        if let Some(applied) = &result.applied {
            target.clone_from(applied);
        }
    }
    result
}

/// Validate a file name: length bounds as for strings, and a single plain
/// name with no whitespace, control characters or path separators. A
/// malformed name is always an error, even when a default exists.
pub fn validate_filename(
    target: &mut String,
    value: &str,
    mode: UpdateMode,
    length: &RangeInclusive<usize>,
    default: Option<&str>,
) -> Validation<String> {
    let malformed = matches!(value, "." | "..")
        || value
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '/' | '\\'));
    if malformed {
        return Validation::error();
    }
    validate_str(target, value, mode, length, default)
}

/// Parse a console integer token. Accepts an optional sign and decimal digits.
pub fn parse_int(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok()
}

/// Parse an ON/OFF switch (also YES/NO, TRUE/FALSE), case-insensitive.
pub fn parse_switch(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "ON" | "YES" | "TRUE" => Some(true),
        "OFF" | "NO" | "FALSE" => Some(false),
        _ => None,
    }
}

/// Render a switch the way the console displays it.
pub fn switch_text(on: bool) -> &'static str {
    if on {
        "ON"
    } else {
        "OFF"
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Ok => write!(f, "OK"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

#[cfg(test)]
#[path = "config_value_tests.rs"]
mod tests;
