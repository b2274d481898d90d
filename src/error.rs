//! Error types
//!
//! Every failure the engine reports falls into one of five kinds, see
//! [`ErrorKind`]. Callers branch on the kind, not on the message text.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Engine errors
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid value for {field}: {message}")]
    Validation { field: String, message: String },

    #[error("invalid value for {field}: got {value:?}, expected one of {expected}")]
    InvalidReference {
        field: String,
        value: String,
        expected: String,
    },

    #[error("import id {id:?} doesn't match any of the accepted formats: {}", .patterns.join(", "))]
    NoPatternMatched { id: String, patterns: Vec<String> },

    #[error(
        "API request failed{}: {message}",
        .status.map(|s| format!(" ({s})")).unwrap_or_default()
    )]
    Transport {
        status: Option<u16>,
        message: String,
    },

    #[error("resource not found: {url}")]
    NotFound { url: String },

    #[error("{0}")]
    Operation(OperationError),

    #[error("timed out after {elapsed:?} waiting for {description}; remote state is unknown")]
    Timeout {
        description: String,
        elapsed: Duration,
    },
}

/// The five error kinds callers must be able to tell apart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Transport,
    NotFound,
    Operation,
    Timeout,
}

impl Error {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn transport(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. }
            | Self::InvalidReference { .. }
            | Self::NoPatternMatched { .. } => ErrorKind::Validation,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Operation(_) => ErrorKind::Operation,
            Self::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Whether resubmitting the same call may succeed.
    ///
    /// A timeout is retryable, but only after the caller has reconciled the
    /// actual remote state.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Transport { status: None, .. } => true,
            Self::Transport {
                status: Some(status),
                ..
            } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

impl From<OperationError> for Error {
    fn from(err: OperationError) -> Self {
        Self::Operation(err)
    }
}

/// A single server-reported failure inside a completed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationErrorEntry {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Structured error attached to an operation that finished unsuccessfully
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OperationError {
    #[serde(default)]
    pub errors: Vec<OperationErrorEntry>,
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.errors.is_empty() {
            return write!(f, "operation failed without error details");
        }
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.code, e.message))
            .collect();
        write!(f, "operation failed: {}", parts.join("; "))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_cover_validation_family() {
        let err = Error::NoPatternMatched {
            id: "a/b/c/d".to_string(),
            patterns: vec!["(?P<name>[^/]+)".to_string()],
        };
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err = Error::InvalidReference {
            field: "subnetwork".to_string(),
            value: "a/b".to_string(),
            expected: "name".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_transport_statuses() {
        assert!(Error::transport(Some(503), "unavailable").is_retryable());
        assert!(Error::transport(Some(429), "slow down").is_retryable());
        assert!(Error::transport(None, "connection reset").is_retryable());
        assert!(!Error::transport(Some(400), "bad request").is_retryable());
    }

    #[test]
    fn test_operation_error_display() {
        let err = OperationError {
            errors: vec![OperationErrorEntry {
                code: "QUOTA_EXCEEDED".to_string(),
                message: "Quota 'STATIC_ADDRESSES' exceeded".to_string(),
                location: None,
            }],
        };
        assert_eq!(
            Error::from(err).to_string(),
            "operation failed: QUOTA_EXCEEDED: Quota 'STATIC_ADDRESSES' exceeded"
        );
    }

    #[test]
    fn test_timeout_is_distinct_from_operation() {
        let err = Error::Timeout {
            description: "Creating Address".to_string(),
            elapsed: Duration::from_secs(240),
        };
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("unknown"));
    }
}
