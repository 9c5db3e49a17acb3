//! Error types for the advisor round-trip.

use reqwest::StatusCode;
use thiserror::Error;

use crate::advisor::Advisor;

/// Text shown to the user for any failed request.
pub const USER_FACING_ERROR: &str = "Error: Unable to fetch response. Please try again.";

/// Any failure fetching an answer.
///
/// Variants exist for diagnostics only; the widget shows
/// [`USER_FACING_ERROR`] for all of them.
#[derive(Error, Debug)]
pub enum RequestFailure {
    /// Connection, TLS or transport error.
    #[error("HTTP error: {0}")]
    Network(#[from] reqwest::Error),

    /// The advisor answered with a non-success status.
    #[error("advisor returned {status}: {body}")]
    Status {
        status: StatusCode,
        body: String,
    },

    /// The body was not a valid answer.
    #[error("malformed answer body: {0}")]
    Decode(#[from] serde_json::Error),

    /// No endpoint is configured for the advisor.
    #[error("no endpoint configured for advisor {0}")]
    UnknownAdvisor(Advisor),
}

impl RequestFailure {
    /// Short label used as a structured log field.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Network(_) => "network",
            Self::Status { .. } => "status",
            Self::Decode(_) => "decode",
            Self::UnknownAdvisor(_) => "unknown_advisor",
        }
    }
}

/// Rejections raised before any request is made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    #[error("a question is required")]
    EmptyQuery,
}

/// Result alias for advisor calls.
pub type Result<T> = std::result::Result<T, RequestFailure>;
