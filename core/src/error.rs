//! Error types for the Phaxio client.
//!
//! # Design
//! Every failed request produces exactly one `PhaxioError`. The first five
//! variants come from classifying an HTTP response and carry the `message`
//! field of the response envelope. `Connection` is produced when the transport
//! never obtained a response and carries the transport's own description.

use thiserror::Error;

/// Errors returned by `PhaxioClient` and the resource wrappers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PhaxioError {
    /// The server returned 401: the API key/secret pair was rejected.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The server returned 404.
    #[error("not found: {0}")]
    NotFound(String),

    /// The server returned 422: the parameters were rejected.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The server returned 429.
    #[error("rate limited: {0}")]
    RateLimited(String),

    /// A 5xx response, an envelope reporting `success: false`, or a body that
    /// could not be parsed.
    #[error("API error: {0}")]
    General(String),

    /// The HTTP call could not be completed.
    #[error("connection failed: {0}")]
    Connection(String),
}

/// Fieldless discriminant of `PhaxioError`, for callers that only branch on
/// the category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Authentication,
    NotFound,
    InvalidRequest,
    RateLimited,
    General,
    Connection,
}

impl PhaxioError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PhaxioError::Authentication(_) => ErrorKind::Authentication,
            PhaxioError::NotFound(_) => ErrorKind::NotFound,
            PhaxioError::InvalidRequest(_) => ErrorKind::InvalidRequest,
            PhaxioError::RateLimited(_) => ErrorKind::RateLimited,
            PhaxioError::General(_) => ErrorKind::General,
            PhaxioError::Connection(_) => ErrorKind::Connection,
        }
    }

    /// The human-readable message, without the category prefix.
    pub fn message(&self) -> &str {
        match self {
            PhaxioError::Authentication(msg)
            | PhaxioError::NotFound(msg)
            | PhaxioError::InvalidRequest(msg)
            | PhaxioError::RateLimited(msg)
            | PhaxioError::General(msg)
            | PhaxioError::Connection(msg) => msg,
        }
    }

    /// Whether reissuing the same request could succeed. The client never
    /// retries on its own; this only informs the caller's policy.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PhaxioError::RateLimited(_) | PhaxioError::Connection(_)
        )
    }
}
