//! Tests for data access error types.

use std::time::Duration;

use crate::store::{DataAccessError, DataResult};

#[test]
fn rejected_error_displays_status_and_message() {
    let err = DataAccessError::rejected(409, Some("23505"), "duplicate key value");
    assert_eq!(
        err.to_string(),
        "Remote store rejected the request (409): duplicate key value"
    );
    assert_eq!(err.backend_code(), Some("23505"));
}

#[test]
fn timeout_error_displays_duration() {
    let err = DataAccessError::Timeout {
        after: Duration::from_secs(5),
    };
    assert_eq!(err.to_string(), "Remote store did not answer within 5s");
}

#[test]
fn invalid_request_error_displays_correctly() {
    let err = DataAccessError::InvalidRequest {
        message: "table name must not be empty".to_string(),
    };
    assert_eq!(
        err.to_string(),
        "Invalid request: table name must not be empty"
    );
}

#[test]
fn server_errors_are_transient() {
    assert!(DataAccessError::rejected(503, None, "unavailable").is_transient());
    assert!(
        DataAccessError::Timeout {
            after: Duration::from_millis(10)
        }
        .is_transient()
    );
}

#[test]
fn constraint_violations_are_permanent() {
    assert!(!DataAccessError::rejected(409, Some("23505"), "duplicate").is_transient());
    assert!(
        !DataAccessError::InvalidResponse {
            message: "bad json".to_string()
        }
        .is_transient()
    );
}

#[test]
fn serde_errors_become_invalid_response() {
    let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
    let err: DataAccessError = parse.unwrap_err().into();
    assert!(matches!(err, DataAccessError::InvalidResponse { .. }));
    assert_eq!(err.backend_code(), None);
}

#[test]
fn data_result_err_returns_error() {
    let result: DataResult<()> = Err(DataAccessError::rejected(404, Some("PGRST205"), "missing"));
    assert!(result.is_err());
}
