use crate::freshness::TimestampError;
use crate::model::ErrorBody;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors returned by the stub objects service.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Object with id={0} was not found.")]
    NotFound(String),

    #[error("{0} is a reserved id and the data object of it cannot be overridden.")]
    Reserved(String),

    #[error("{0}")]
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Reserved(_) => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(ErrorBody {
            error: self.to_string(),
        });

        (status, body).into_response()
    }
}

/// Why a check scenario failed.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("{operation}: expected status {expected}, got {actual}")]
    Status {
        operation: &'static str,
        expected: u16,
        actual: u16,
    },

    #[error("{field} mismatch: expected {expected}, got {actual}")]
    Mismatch {
        field: &'static str,
        expected: String,
        actual: String,
    },

    #[error("{field} is missing from the response")]
    Missing { field: &'static str },

    #[error("{field} {value:?} is not within {tolerance_secs}s of now")]
    Stale {
        field: &'static str,
        value: String,
        tolerance_secs: i64,
    },

    #[error("{0}")]
    Assertion(String),

    #[error(transparent)]
    Timestamp(#[from] TimestampError),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl CheckError {
    pub fn mismatch(
        field: &'static str,
        expected: impl std::fmt::Display,
        actual: impl std::fmt::Display,
    ) -> Self {
        CheckError::Mismatch {
            field,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }
}
