//! Error types for the Remedy client subsystem.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the credential file store and refresh lock.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TokenError {
    /// Reading a credential file failed.
    #[error("failed to read credential file {path}: {source}")]
    Read {
        /// Path of the credential file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Writing a credential file failed.
    #[error("failed to write credential file {path}: {source}")]
    Write {
        /// Path of the credential file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// Creating, locking, or removing a refresh lock marker failed.
    #[error("refresh lock error at {path}: {source}")]
    Lock {
        /// Path of the lock marker file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// Errors raised at the HTTP transport boundary.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    /// HTTP client construction failed.
    #[error("failed to build HTTP client: {0}")]
    Build(String),

    /// Sending a request failed before a response was received.
    ///
    /// Covers connection refusal, DNS failure, and timeouts. These are
    /// treated as retryable by the orchestrator.
    #[error("request to {url} failed: {detail}")]
    Request {
        /// The request URL.
        url: String,
        /// Description of the failure.
        detail: String,
    },
}

/// Errors emitted by Remedy client operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum RemedyError {
    /// Login was rejected or a downstream call failed authentication.
    #[error("authentication failed{}: {detail}", fmt_status(.status))]
    Auth {
        /// HTTP status code, when one was received.
        status: Option<u16>,
        /// Upstream response body or failure description.
        detail: String,
    },

    /// The API answered with an error status or an unexpected success code.
    #[error("API error ({status}): {body}")]
    Api {
        /// HTTP status code returned by the API.
        status: u16,
        /// Response body text.
        body: String,
    },

    /// A referenced record does not exist.
    ///
    /// Raised when a work-order id cannot be resolved to an internal entry,
    /// when a company has no generic user, or when a support group lookup
    /// matches nothing. Never retried.
    #[error("not found: {what}")]
    NotFound {
        /// Description of the missing record.
        what: String,
    },

    /// Request transport failed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Response payload could not be interpreted.
    #[error("parse error in {context}: {detail}")]
    Parse {
        /// What was being parsed.
        context: String,
        /// Description of the failure.
        detail: String,
    },

    /// Credential store or refresh lock failure.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// The retry budget was spent without a successful attempt.
    #[error("operation failed after {attempts} attempts: {detail}")]
    Exhausted {
        /// Number of attempts made.
        attempts: u32,
        /// Aggregate of every attempt's failure text.
        detail: String,
    },
}

impl From<serde_json::Error> for RemedyError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse {
            context: "response body".to_string(),
            detail: value.to_string(),
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" ({code})"),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_includes_status_when_present() {
        let err = RemedyError::Auth {
            status: Some(401),
            detail: "bad password".to_string(),
        };
        assert_eq!(err.to_string(), "authentication failed (401): bad password");
    }

    #[test]
    fn test_auth_error_omits_status_when_absent() {
        let err = RemedyError::Auth {
            status: None,
            detail: "connection reset".to_string(),
        };
        assert_eq!(err.to_string(), "authentication failed: connection reset");
    }

    #[test]
    fn test_not_found_display() {
        let err = RemedyError::NotFound {
            what: "work order WO000123".to_string(),
        };
        assert!(err.to_string().contains("WO000123"));
    }

    #[test]
    fn test_token_error_carries_path() {
        let err = TokenError::Read {
            path: PathBuf::from("/tmp/token_svc.txt"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/token_svc.txt"));
    }

    #[test]
    fn test_exhausted_reports_attempts() {
        let err = RemedyError::Exhausted {
            attempts: 3,
            detail: "401; 401; 401".to_string(),
        };
        assert!(err.to_string().contains("3 attempts"));
    }
}
