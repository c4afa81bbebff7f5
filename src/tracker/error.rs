//! Tracker error types.

use miette::Diagnostic;
use thiserror::Error;

use crate::store::DataAccessError;

/// Project and milestone operation errors.
#[derive(Error, Diagnostic, Debug)]
pub enum TrackerError {
    #[error("Validation error: {message}")]
    #[diagnostic(code(tracker::validation))]
    Validation { message: String },

    #[error("Entity not found: {entity_type} with id '{id}'")]
    #[diagnostic(code(tracker::not_found))]
    NotFound { entity_type: String, id: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Data(#[from] DataAccessError),
}

impl TrackerError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        TrackerError::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn not_found(entity_type: &str, id: impl ToString) -> Self {
        TrackerError::NotFound {
            entity_type: entity_type.to_string(),
            id: id.to_string(),
        }
    }
}

/// Result type for tracker operations.
pub type TrackerResult<T> = Result<T, TrackerError>;
