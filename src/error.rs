//! # Terra AC Error Handling
//!
//! This module defines the error enums of the terra-ac-rs crate. Transport
//! implementations raise [`TransportError`]; the coordinator and dispatcher
//! classify those into [`PollError`] and [`CommandError`] for their callers.
//! [`DecodeError`] never leaves a poll: it turns into a placeholder value for
//! the one field that failed.

use std::io::ErrorKind;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a [`RegisterTransport`](crate::modbus::RegisterTransport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The TCP connection could not be established.
    #[error("Cannot connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    /// An operation did not complete within its bound.
    #[error("{operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Socket level failure on an established connection.
    #[error("I/O error ({kind:?}): {message}")]
    Io { kind: ErrorKind, message: String },

    /// The station answered with a Modbus exception.
    #[error("Modbus exception: {0}")]
    Exception(String),

    /// The response frame could not be understood.
    #[error("Malformed Modbus response: {0}")]
    Protocol(String),

    /// An operation was attempted without a connection.
    #[error("Not connected")]
    NotConnected,
}

impl TransportError {
    /// Whether this failure means the connection is unusable.
    pub fn is_connection_failure(&self) -> bool {
        match self {
            TransportError::Connect { .. }
            | TransportError::Timeout { .. }
            | TransportError::NotConnected => true,
            TransportError::Io { kind, .. } => is_connection_kind(*kind),
            TransportError::Exception(_) | TransportError::Protocol(_) => false,
        }
    }

    /// Whether the connection must be dropped and reopened.
    ///
    /// Broader than [`is_connection_failure`](Self::is_connection_failure):
    /// any socket error leaves the stream in an unknown state, even when its
    /// kind is classified as internal.
    pub fn closes_connection(&self) -> bool {
        self.is_connection_failure() || matches!(self, TransportError::Io { .. })
    }

    /// Whether the station answered but the answer was unusable.
    pub fn is_protocol_failure(&self) -> bool {
        match self {
            TransportError::Exception(_) | TransportError::Protocol(_) => true,
            TransportError::Io { kind, .. } => *kind == ErrorKind::InvalidData,
            _ => false,
        }
    }
}

fn is_connection_kind(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::NotConnected
            | ErrorKind::BrokenPipe
            | ErrorKind::TimedOut
            | ErrorKind::UnexpectedEof
            | ErrorKind::AddrNotAvailable
    )
}

/// Errors surfaced by a poll cycle. All of them are recoverable: the cached
/// snapshot is left untouched and the next scheduled tick tries again.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PollError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TransportError> for PollError {
    fn from(err: TransportError) -> Self {
        if err.is_connection_failure() {
            PollError::Connection(err.to_string())
        } else if err.is_protocol_failure() {
            PollError::Protocol(err.to_string())
        } else {
            PollError::Internal(err.to_string())
        }
    }
}

/// Errors surfaced to the caller of a single command.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    /// The requested value is outside what the station accepts.
    #[error("{command}: value {value} outside {min}..={max}")]
    OutOfRange {
        command: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Connection error: {0}")]
    Connection(String),

    /// The station refused or could not parse the write.
    #[error("Command rejected: {0}")]
    Rejected(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TransportError> for CommandError {
    fn from(err: TransportError) -> Self {
        if err.is_connection_failure() {
            CommandError::Connection(err.to_string())
        } else if err.is_protocol_failure() {
            CommandError::Rejected(err.to_string())
        } else {
            CommandError::Internal(err.to_string())
        }
    }
}

/// A single field of the status block could not be decoded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("{field}: expected {expected} registers, got {got}")]
    WrongLength {
        field: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{field}: byte 0x{byte:02X} is not BCD")]
    InvalidBcd { field: &'static str, byte: u8 },

    #[error("{field}: registers are blank")]
    Blank { field: &'static str },
}

/// Errors loading or validating a [`ChargerConfig`](crate::config::ChargerConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_failure_classifies_as_connection() {
        let err = TransportError::Connect {
            target: "10.0.0.5:502".into(),
            reason: "refused".into(),
        };
        assert!(matches!(PollError::from(err), PollError::Connection(_)));
    }

    #[test]
    fn test_timeout_classifies_as_connection() {
        let err = TransportError::Timeout {
            operation: "read",
            after: Duration::from_secs(3),
        };
        assert!(matches!(PollError::from(err), PollError::Connection(_)));
    }

    #[test]
    fn test_exception_classifies_as_protocol() {
        let err = TransportError::Exception("Illegal data address".into());
        assert!(matches!(PollError::from(err), PollError::Protocol(_)));
    }

    #[test]
    fn test_io_kinds() {
        let reset = TransportError::Io {
            kind: ErrorKind::ConnectionReset,
            message: "reset by peer".into(),
        };
        assert!(matches!(PollError::from(reset), PollError::Connection(_)));

        let garbage = TransportError::Io {
            kind: ErrorKind::InvalidData,
            message: "bad frame".into(),
        };
        assert!(matches!(PollError::from(garbage), PollError::Protocol(_)));

        let other = TransportError::Io {
            kind: ErrorKind::PermissionDenied,
            message: "nope".into(),
        };
        assert!(matches!(PollError::from(other), PollError::Internal(_)));
    }

    #[test]
    fn test_any_io_error_closes_connection() {
        for kind in [ErrorKind::Other, ErrorKind::WriteZero, ErrorKind::Interrupted] {
            let err = TransportError::Io {
                kind,
                message: "socket".into(),
            };
            assert!(err.closes_connection(), "{kind:?}");
            assert!(!err.is_connection_failure(), "{kind:?}");
        }
        assert!(TransportError::NotConnected.closes_connection());
        assert!(!TransportError::Exception("IllegalDataValue".into()).closes_connection());
        assert!(!TransportError::Protocol("short frame".into()).closes_connection());
    }

    #[test]
    fn test_command_error_classification() {
        let err = TransportError::Exception("Illegal data value".into());
        assert!(matches!(CommandError::from(err), CommandError::Rejected(_)));
        assert!(matches!(
            CommandError::from(TransportError::NotConnected),
            CommandError::Connection(_)
        ));
    }

    #[test]
    fn test_out_of_range_message() {
        let err = CommandError::OutOfRange {
            command: "set_current_limit",
            value: 40.0,
            min: 0.0,
            max: 32.0,
        };
        assert_eq!(err.to_string(), "set_current_limit: value 40 outside 0..=32");
    }
}
