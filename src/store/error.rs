//! Data access error types.
//!
//! Every failure the remote table store reports, whatever the operation,
//! surfaces as a [`DataAccessError`]. Variants record the shape of the
//! failure; callers that only care that "the store said no" can treat the
//! type as opaque.

use std::time::Duration;

use miette::Diagnostic;
use thiserror::Error;

/// Failure signalled by the table data adapter.
#[derive(Error, Diagnostic, Debug)]
pub enum DataAccessError {
    #[error("Remote store rejected the request ({status}): {message}")]
    #[diagnostic(code(tracker::store::rejected))]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
        details: Option<String>,
        hint: Option<String>,
    },

    #[error("Failed to reach the remote store")]
    #[diagnostic(
        code(tracker::store::connection_failed),
        help("Check TRACKER_URL (or --url) and that the store is running.")
    )]
    Connection {
        #[source]
        source: reqwest::Error,
    },

    #[error("Remote store did not answer within {after:?}")]
    #[diagnostic(code(tracker::store::timeout))]
    Timeout { after: Duration },

    #[error("Invalid response from remote store: {message}")]
    #[diagnostic(code(tracker::store::invalid_response))]
    InvalidResponse { message: String },

    #[error("Invalid request: {message}")]
    #[diagnostic(code(tracker::store::invalid_request))]
    InvalidRequest { message: String },
}

impl DataAccessError {
    /// Build a rejection carrying only a status and message.
    pub fn rejected(status: u16, code: Option<&str>, message: impl Into<String>) -> Self {
        DataAccessError::Rejected {
            status,
            code: code.map(str::to_string),
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            DataAccessError::Connection { .. } | DataAccessError::Timeout { .. } => true,
            DataAccessError::Rejected { status, .. } => *status >= 500,
            DataAccessError::InvalidResponse { .. } | DataAccessError::InvalidRequest { .. } => {
                false
            }
        }
    }

    /// Backend error code (e.g. a Postgres SQLSTATE or `PGRST` code), if any.
    pub fn backend_code(&self) -> Option<&str> {
        match self {
            DataAccessError::Rejected { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for DataAccessError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            DataAccessError::Connection { source: e }
        } else {
            DataAccessError::InvalidResponse {
                message: e.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for DataAccessError {
    fn from(e: serde_json::Error) -> Self {
        DataAccessError::InvalidResponse {
            message: e.to_string(),
        }
    }
}

/// Result type for data access operations.
pub type DataResult<T> = Result<T, DataAccessError>;
