// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Layered Tango failure.
//!
//! A failure is an ordered stack of records. The transport produces the
//! innermost cause first and every layer that re-throws appends its own
//! record, so the order is meaningful and is never rearranged.

use std::fmt;

use crate::types::{DataType, ErrSeverity};

/// One record of a failure stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevError {
    pub reason: String,
    pub desc: String,
    pub origin: String,
    pub severity: ErrSeverity,
}

impl DevError {
    pub fn new(
        reason: impl Into<String>,
        desc: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            reason: reason.into(),
            desc: desc.into(),
            origin: origin.into(),
            severity: ErrSeverity::Err,
        }
    }

    pub fn with_severity(mut self, severity: ErrSeverity) -> Self {
        self.severity = severity;
        self
    }
}

impl fmt::Display for DevError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {} (origin: {})",
            self.reason, self.severity, self.desc, self.origin
        )
    }
}

/// Failure returned by every fallible Tango operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TangoError {
    pub failures: Vec<DevError>,
}

pub type TangoResult<T> = std::result::Result<T, TangoError>;

// Reasons the marshalling layer produces on its own.
pub const REASON_DATA_TYPE: &str = "Data type error";
pub const REASON_INVALID_ARGS: &str = "API_InvalidArgs";
pub const REASON_DATA_TOO_LARGE: &str = "API_DataTooLarge";
pub const REASON_MEMORY: &str = "API_MemoryAllocation";
pub const REASON_PANIC: &str = "API_InternalPanic";

impl TangoError {
    /// Single-record failure with `ERR` severity.
    pub fn new(
        reason: impl Into<String>,
        desc: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        DevError::new(reason, desc, origin).into()
    }

    /// The requested tag has no conversion for `operation`
    /// ("command writing", "attribute reading", ...).
    pub fn data_type(operation: &str, origin: impl Into<String>) -> Self {
        Self::new(
            REASON_DATA_TYPE,
            format!("The requested data type is not implemented for {operation}!"),
            origin,
        )
    }

    /// Same as [`TangoError::data_type`] but names the offending tag code.
    pub fn unknown_tag(operation: &str, code: u32, origin: impl Into<String>) -> Self {
        let tag = DataType::from_code(code).map_or("unknown", DataType::name);
        Self::new(
            REASON_DATA_TYPE,
            format!(
                "The requested data type is not implemented for {operation}! (tag {code}, {tag})"
            ),
            origin,
        )
    }

    pub fn invalid_args(desc: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::new(REASON_INVALID_ARGS, desc, origin)
    }

    pub fn too_large(len: usize, origin: impl Into<String>) -> Self {
        Self::new(
            REASON_DATA_TOO_LARGE,
            format!("{len} elements do not fit a 32-bit length"),
            origin,
        )
    }

    pub fn out_of_memory(bytes: usize, origin: impl Into<String>) -> Self {
        Self::new(
            REASON_MEMORY,
            format!("Failed to allocate {bytes} bytes"),
            origin,
        )
    }

    /// A Rust panic caught before it could cross a foreign boundary.
    pub fn panic(message: impl Into<String>, origin: impl Into<String>) -> Self {
        DevError::new(REASON_PANIC, message, origin)
            .with_severity(ErrSeverity::Panic)
            .into()
    }

    /// Re-throw with one more record on top of the stack.
    #[must_use]
    pub fn push(
        mut self,
        reason: impl Into<String>,
        desc: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        self.failures.push(DevError::new(reason, desc, origin));
        self
    }

    /// Reason of the innermost record.
    pub fn reason(&self) -> &str {
        self.failures.first().map_or("", |f| f.reason.as_str())
    }

    pub fn is_data_type_error(&self) -> bool {
        self.reason() == REASON_DATA_TYPE
    }
}

impl From<DevError> for TangoError {
    fn from(err: DevError) -> Self {
        Self {
            failures: vec![err],
        }
    }
}

impl fmt::Display for TangoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.failures.as_slice() {
            [] => f.write_str("Tango error with an empty failure stack"),
            [only] => write!(f, "{only}"),
            [first, rest @ ..] => {
                write!(f, "{first}")?;
                for failure in rest {
                    write!(f, "; {failure}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for TangoError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_error_record() {
        let err = TangoError::data_type("command writing", "tango_command_inout");
        assert_eq!(err.failures.len(), 1);
        let rec = &err.failures[0];
        assert_eq!(rec.reason, "Data type error");
        assert_eq!(
            rec.desc,
            "The requested data type is not implemented for command writing!"
        );
        assert_eq!(rec.origin, "tango_command_inout");
        assert_eq!(rec.severity, ErrSeverity::Err);
        assert!(err.is_data_type_error());
    }

    #[test]
    fn push_keeps_order() {
        let err = TangoError::new("API_CommandNotFound", "no such command", "device")
            .push("API_CommandFailed", "command failed", "proxy");
        assert_eq!(err.reason(), "API_CommandNotFound");
        assert_eq!(err.failures[1].reason, "API_CommandFailed");
        let text = err.to_string();
        assert!(text.starts_with("API_CommandNotFound [ERR]"));
        assert!(text.contains("; API_CommandFailed"));
    }

    #[test]
    fn unknown_tag_names_code() {
        let err = TangoError::unknown_tag("property reading", 99, "origin");
        assert!(err.failures[0].desc.contains("tag 99, unknown"));
        let err = TangoError::unknown_tag("property reading", 19, "origin");
        assert!(err.failures[0].desc.contains("DevState"));
    }

    #[test]
    fn panic_severity() {
        let err = TangoError::panic("boom", "here");
        assert_eq!(err.failures[0].severity, ErrSeverity::Panic);
    }
}
