//! Error types for shaping-rule reconstruction.
//!
//! This module defines the error types used throughout the tcshape crates.
//! All errors implement `std::error::Error` via `thiserror`.

use std::io;
use thiserror::Error;

/// Result type alias for tcshape operations.
pub type TcShapeResult<T> = Result<T, TcShapeError>;

/// Errors that can occur while reading and joining traffic-control state.
#[derive(Debug, Error)]
pub enum TcShapeError {
    /// Failed to execute a shell command (spawn error).
    #[error("Failed to execute shell command '{command}': {source}")]
    ShellExec {
        /// The command that failed to execute.
        command: String,
        /// The underlying IO error.
        #[source]
        source: io::Error,
    },

    /// Shell command returned non-zero exit code.
    #[error("Shell command failed: '{command}' (exit code {exit_code}): {output}")]
    ShellCommandFailed {
        /// The command that failed.
        command: String,
        /// The exit code.
        exit_code: i32,
        /// Combined stdout/stderr output.
        output: String,
    },

    /// The network interface does not exist.
    #[error("Network interface '{device}' not found")]
    DeviceNotFound {
        /// The device name.
        device: String,
    },

    /// A filter references a packet mark that no mangle rule sets.
    ///
    /// The firewall and traffic-control configurations are out of sync.
    #[error("Mangle mark not found: {mark_id} (0x{mark_id:x})")]
    MangleMarkNotFound {
        /// The mark id carried by the filter's `handle`.
        mark_id: u32,
    },

    /// No rows have been stored for this object kind yet.
    #[error("Table not found: {table}")]
    TableNotFound {
        /// The table name (`qdisc`, `class` or `filter`).
        table: String,
    },

    /// A listing row could not be decoded.
    #[error("Invalid {kind} record '{line}': {message}")]
    InvalidRecord {
        /// The listing kind (e.g. "mangle").
        kind: String,
        /// The offending line.
        line: String,
        /// Error message.
        message: String,
    },
}

impl TcShapeError {
    /// Creates a device not found error.
    pub fn device_not_found(device: impl Into<String>) -> Self {
        Self::DeviceNotFound {
            device: device.into(),
        }
    }

    /// Creates a table not found error.
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// Creates an invalid record error.
    pub fn invalid_record(
        kind: impl Into<String>,
        line: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidRecord {
            kind: kind.into(),
            line: line.into(),
            message: message.into(),
        }
    }

    /// Returns true if the inspected interface does not exist.
    pub fn is_device_not_found(&self) -> bool {
        matches!(self, TcShapeError::DeviceNotFound { .. })
    }

    /// Returns true if the firewall and tc configurations disagree.
    pub fn is_data_inconsistency(&self) -> bool {
        matches!(self, TcShapeError::MangleMarkNotFound { .. })
    }

    /// Returns true if this only signals that no data exists yet.
    ///
    /// Callers treat these as empty results rather than failures.
    pub fn is_missing_data(&self) -> bool {
        matches!(self, TcShapeError::TableNotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_error_display() {
        let err = TcShapeError::device_not_found("eth9");
        assert_eq!(err.to_string(), "Network interface 'eth9' not found");
    }

    #[test]
    fn test_mangle_mark_display() {
        let err = TcShapeError::MangleMarkNotFound { mark_id: 101 };
        assert_eq!(err.to_string(), "Mangle mark not found: 101 (0x65)");
    }

    #[test]
    fn test_shell_command_failed() {
        let err = TcShapeError::ShellCommandFailed {
            command: "/sbin/tc qdisc show dev \"eth0\"".to_string(),
            exit_code: 2,
            output: "RTNETLINK answers: Operation not permitted".to_string(),
        };
        assert!(err.to_string().contains("tc qdisc show"));
        assert!(err.to_string().contains("exit code 2"));
    }

    #[test]
    fn test_classification() {
        assert!(TcShapeError::device_not_found("eth0").is_device_not_found());
        assert!(TcShapeError::MangleMarkNotFound { mark_id: 1 }.is_data_inconsistency());
        assert!(TcShapeError::table_not_found("class").is_missing_data());
        assert!(!TcShapeError::table_not_found("class").is_data_inconsistency());
        assert!(!TcShapeError::invalid_record("mangle", "x", "y").is_missing_data());
    }
}
