use miette::Diagnostic;
use thiserror::Error;

use crate::store::DataAccessError;
use crate::tracker::TrackerError;

#[derive(Error, Diagnostic, Debug)]
pub enum CliError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Data(#[from] DataAccessError),

    #[error("Invalid argument: {message}")]
    #[diagnostic(code(tracker::cli::invalid_argument))]
    InvalidArgument { message: String },

    #[error("Failed to render output: {message}")]
    #[diagnostic(code(tracker::cli::output))]
    Output { message: String },
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        CliError::Output {
            message: e.to_string(),
        }
    }
}

pub type CliResult<T> = Result<T, CliError>;
