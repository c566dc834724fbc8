//! Error types for relwatch

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::github::RateLimit;

/// Result type alias for relwatch operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in relwatch
#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        /// Quota reported with the refusal; `reset` says when to retry
        quota: RateLimit,
    },

    #[error("Upstream error: {message}")]
    Upstream { status: Option<u16>, message: String },

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Unroutable query: {0}")]
    UnroutableQuery(String),

    #[error("Turn cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// Failure kinds surfaced to the user in an [`Answer`](crate::agent::Answer).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    AuthError,
    NotFound,
    RateLimited,
    UpstreamError,
    DecodeError,
    Timeout,
    UnroutableQuery,
    Cancelled,
    Internal,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::AuthError => "auth_error",
            FailureKind::NotFound => "not_found",
            FailureKind::RateLimited => "rate_limited",
            FailureKind::UpstreamError => "upstream_error",
            FailureKind::DecodeError => "decode_error",
            FailureKind::Timeout => "timeout",
            FailureKind::UnroutableQuery => "unroutable_query",
            FailureKind::Cancelled => "cancelled",
            FailureKind::Internal => "internal",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error into the user-facing failure kind.
    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Auth(_) => FailureKind::AuthError,
            Error::NotFound(_) => FailureKind::NotFound,
            Error::RateLimited { .. } => FailureKind::RateLimited,
            Error::Upstream { .. } => FailureKind::UpstreamError,
            Error::Decode(_) | Error::Json(_) => FailureKind::DecodeError,
            Error::Timeout(_) => FailureKind::Timeout,
            Error::UnroutableQuery(_) => FailureKind::UnroutableQuery,
            Error::Cancelled => FailureKind::Cancelled,
            Error::Config(_) | Error::Io(_) | Error::Other(_) => FailureKind::Internal,
        }
    }

    pub(crate) fn upstream(status: Option<u16>, message: impl Into<String>) -> Self {
        Error::Upstream {
            status,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Timeout(err.to_string())
        } else if err.is_decode() || err.is_body() {
            Error::Decode(err.to_string())
        } else {
            Error::upstream(err.status().map(|s| s.as_u16()), err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::Auth("x".into()).kind(), FailureKind::AuthError);
        assert_eq!(Error::NotFound("x".into()).kind(), FailureKind::NotFound);
        assert_eq!(
            Error::RateLimited { message: "x".into(), quota: RateLimit::default() }.kind(),
            FailureKind::RateLimited
        );
        assert_eq!(Error::upstream(Some(502), "bad gateway").kind(), FailureKind::UpstreamError);
        assert_eq!(Error::Timeout("x".into()).kind(), FailureKind::Timeout);
        assert_eq!(Error::Other("x".into()).kind(), FailureKind::Internal);
    }

    #[test]
    fn test_json_error_is_decode() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert_eq!(err.kind(), FailureKind::DecodeError);
    }

    #[test]
    fn test_failure_kind_serialization() {
        let json = serde_json::to_string(&FailureKind::RateLimited).unwrap();
        assert_eq!(json, "\"rate_limited\"");
        assert_eq!(FailureKind::NotFound.to_string(), "not_found");
    }
}
