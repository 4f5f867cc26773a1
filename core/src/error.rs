use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// The error type for cloudrt operations
#[derive(Error, Debug)]
#[error("{message}")]
pub struct Error {
    kind: ErrorKind,
    message: String,
    code: Option<String>,
    #[source]
    source: Option<anyhow::Error>,
}

/// The kind of error that occurred
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request cannot be signed (colliding or duplicate parameters, etc.)
    ///
    /// Never retried.
    MalformedRequest,

    /// No usable credential, or the service rejected the credential.
    Unauthenticated,

    /// The credential is valid but not allowed to perform the operation.
    Unauthorized,

    /// Network failures, throttling and 5xx responses.
    ///
    /// Retried with bounded attempts where a retry policy applies.
    Transient,

    /// The remote job reached a terminal failure state.
    ///
    /// This is a business outcome and is never retried.
    JobFailed,

    /// The attempt budget was exhausted before a definitive answer.
    ///
    /// For jobs this means the job is still pending server-side; its final
    /// state is unknown.
    Timeout,

    /// The caller cancelled the wait.
    Cancelled,

    /// Configuration error (missing fields, invalid values)
    ConfigInvalid,

    /// Unexpected errors (decode failures, unknown responses, etc.)
    Unexpected,
}

impl Error {
    /// Create a new error with the given kind and message
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            source: None,
        }
    }

    /// Add a source error
    pub fn with_source(mut self, source: impl Into<anyhow::Error>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Attach the error code reported by the remote service.
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Get the error code reported by the remote service, if any.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    /// Check if this is an authentication or authorization error.
    ///
    /// These errors are surfaced immediately and never cached or retried.
    pub fn is_auth_error(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Unauthenticated | ErrorKind::Unauthorized
        )
    }

    /// Check if this error may go away by trying again.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Transient | ErrorKind::Timeout)
    }
}

// Convenience constructors
impl Error {
    /// Create a malformed request error
    pub fn malformed_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedRequest, message)
    }

    /// Create an unauthenticated error
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthenticated, message)
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a transient error
    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transient, message)
    }

    /// Create a job failed error with the code reported by the remote job.
    pub fn job_failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::JobFailed, message).with_code(code)
    }

    /// Create a timeout error
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// Create a cancelled error
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// Create a config invalid error
    pub fn config_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ConfigInvalid, message)
    }

    /// Create an unexpected error
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unexpected, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MalformedRequest => write!(f, "malformed request"),
            ErrorKind::Unauthenticated => write!(f, "unauthenticated"),
            ErrorKind::Unauthorized => write!(f, "unauthorized"),
            ErrorKind::Transient => write!(f, "transient failure"),
            ErrorKind::JobFailed => write!(f, "job failed"),
            ErrorKind::Timeout => write!(f, "timed out"),
            ErrorKind::Cancelled => write!(f, "cancelled"),
            ErrorKind::ConfigInvalid => write!(f, "invalid configuration"),
            ErrorKind::Unexpected => write!(f, "unexpected error"),
        }
    }
}

/// Convenience type alias for Results
pub type Result<T> = std::result::Result<T, Error>;

/// Rebuild an error observed by one of several waiters of a shared attempt.
///
/// The copy keeps kind, message and code; the shared original is its source.
impl From<Arc<Error>> for Error {
    fn from(err: Arc<Error>) -> Self {
        Self {
            kind: err.kind,
            message: err.message.clone(),
            code: err.code.clone(),
            source: Some(anyhow::Error::new(err)),
        }
    }
}

// Common From implementations
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(err)
    }
}

impl From<std::fmt::Error> for Error {
    fn from(err: std::fmt::Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::Error> for Error {
    fn from(err: http::Error) -> Self {
        Self::malformed_request(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::header::InvalidHeaderValue> for Error {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::malformed_request(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUri> for Error {
    fn from(err: http::uri::InvalidUri) -> Self {
        Self::malformed_request(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<http::uri::InvalidUriParts> for Error {
    fn from(err: http::uri::InvalidUriParts) -> Self {
        Self::malformed_request(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Self::unexpected(err.to_string()).with_source(anyhow::Error::from(err))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::unexpected(format!("background task failed: {err}"))
            .with_source(anyhow::Error::from(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_kind_predicates() {
        assert!(Error::unauthenticated("x").is_auth_error());
        assert!(Error::unauthorized("x").is_auth_error());
        assert!(!Error::transient("x").is_auth_error());

        assert!(Error::transient("x").is_retryable());
        assert!(Error::timeout("x").is_retryable());
        assert!(!Error::job_failed("Code", "x").is_retryable());
        assert!(!Error::malformed_request("x").is_retryable());
    }

    #[test]
    fn test_job_failed_carries_code() {
        let err = Error::job_failed("InvalidInstance.NotFound", "instance gone");
        assert_eq!(err.kind(), ErrorKind::JobFailed);
        assert_eq!(err.code(), Some("InvalidInstance.NotFound"));
        assert_eq!(err.to_string(), "instance gone");
    }

    #[test]
    fn test_from_shared_keeps_identity() {
        let shared = Arc::new(Error::job_failed("Boom", "it broke"));
        let err = Error::from(shared.clone());

        assert_eq!(err.kind(), ErrorKind::JobFailed);
        assert_eq!(err.code(), Some("Boom"));
        assert_eq!(err.message(), "it broke");
        assert!(err.source().is_some());
        assert_eq!(Arc::strong_count(&shared), 2);
    }
}
