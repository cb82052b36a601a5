//! Quote results and errors.

use std::time::Duration;
use thiserror::Error;

use crate::observability::metrics::FailureKind;

/// Text returned by the quote backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
}

/// Errors that can occur while fetching a quote.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuoteError {
    /// Connection-level failure reaching the backend.
    #[error("quote backend unavailable: {0}")]
    Unavailable(String),

    /// The call deadline elapsed.
    #[error("quote backend timed out after {0:?}")]
    Timeout(Duration),

    /// Direct transport got a non-2xx answer.
    #[error("quote backend returned status {0}")]
    Status(u16),

    /// Remote-procedure transport got a non-OK status.
    #[error("could not get quote: {code}: {message}")]
    Rpc { code: String, message: String },

    /// Response body was not UTF-8.
    #[error("quote backend returned a non-UTF-8 body")]
    InvalidBody,

    /// Configured endpoint cannot be used.
    #[error("invalid quote endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
}

impl QuoteError {
    /// Label used in the failure counter.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            QuoteError::Timeout(_) => FailureKind::BackendTimeout,
            QuoteError::Status(_) | QuoteError::Rpc { .. } | QuoteError::InvalidBody => {
                FailureKind::BackendStatus
            }
            QuoteError::Unavailable(_) | QuoteError::InvalidEndpoint { .. } => {
                FailureKind::BackendUnavailable
            }
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, QuoteError::Timeout(_))
    }
}

/// Result type for quote fetches.
pub type QuoteResult = Result<Quote, QuoteError>;
