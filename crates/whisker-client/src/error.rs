//! Error types for backend requests.
//!
//! Messages stay constant; context travels in fields so call sites can log
//! once and match on the failure class.

use reqwest::StatusCode;
use thiserror::Error;

/// Result alias for backend client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Failure classes for a single backend request.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No HTTP response arrived: connection, DNS, or timeout.
    #[error("status backend unreachable")]
    Transport {
        /// Operation identifier.
        operation: &'static str,
        /// Source HTTP client error.
        source: reqwest::Error,
    },
    /// The backend answered with a non-success status.
    #[error("status backend rejected the request")]
    Backend {
        /// Operation identifier.
        operation: &'static str,
        /// HTTP status returned by the backend.
        status: StatusCode,
        /// Text from the body's `error`/`msg` field, or the status line.
        message: String,
    },
    /// A success response carried a body that could not be decoded.
    #[error("status backend response could not be decoded")]
    InvalidBody {
        /// Operation identifier.
        operation: &'static str,
        /// Source decode error.
        source: reqwest::Error,
    },
    /// The request URL could not be derived from the base URL.
    #[error("invalid request URL")]
    InvalidUrl {
        /// Operation identifier.
        operation: &'static str,
        /// Source URL parse error.
        source: url::ParseError,
    },
    /// The underlying HTTP client could not be constructed.
    #[error("failed to build HTTP client")]
    Build {
        /// Source HTTP client error.
        source: reqwest::Error,
    },
}

impl ClientError {
    pub(crate) const fn transport(operation: &'static str, source: reqwest::Error) -> Self {
        Self::Transport { operation, source }
    }

    pub(crate) const fn backend(
        operation: &'static str,
        status: StatusCode,
        message: String,
    ) -> Self {
        Self::Backend {
            operation,
            status,
            message,
        }
    }

    pub(crate) const fn invalid_body(operation: &'static str, source: reqwest::Error) -> Self {
        Self::InvalidBody { operation, source }
    }

    pub(crate) const fn invalid_url(operation: &'static str, source: url::ParseError) -> Self {
        Self::InvalidUrl { operation, source }
    }

    /// True when the failure happened before any HTTP response arrived.
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Text suitable for surfacing to operators: the backend's own message
    /// for rejections, the fixed description otherwise.
    #[must_use]
    pub fn display_message(&self) -> String {
        match self {
            Self::Backend { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}
