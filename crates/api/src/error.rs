//! API Error Types

use axum::{
    extract::rejection::BytesRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use data_validator::ValidationError;
use serde::Serialize;
use std::any::Any;
use storage::StorageError;
use thiserror::Error;
use tracing::error;

/// Errors surfaced by request handlers
#[derive(Debug, Error)]
pub enum ApiError {
    /// Caller sent a bad payload; do not retry
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Body could not be read, e.g. over the size limit
    #[error(transparent)]
    Body(#[from] BytesRejection),
    /// Store failed; safe to retry
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// Anything else, detail stays in the logs
    #[error("internal server error")]
    Internal,
}

/// JSON body of every error response
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Body(rejection) => rejection.status(),
            ApiError::Storage(_) | ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short reason string sent to the client
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::Validation(e) => e.reason(),
            ApiError::Body(rejection) if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE => {
                "Payload too large"
            }
            ApiError::Body(_) => "Invalid data format",
            ApiError::Storage(StorageError::Write(_)) => "Failed to store data",
            ApiError::Storage(StorageError::Query(_) | StorageError::Init(_)) => "Database error",
            ApiError::Internal => "Server error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(ErrorBody { error: self.reason() })).into_response()
    }
}

/// Turn a handler panic into a generic 500 without leaking the payload.
pub fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        *s
    } else {
        "unknown panic payload"
    };
    error!("Unexpected error: handler panicked: {}", detail);

    ApiError::Internal.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = ApiError::from(ValidationError::MissingFields(vec!["humidity"]));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.reason(), "Missing required fields");

        let err = ApiError::from(ValidationError::InvalidFormat {
            field: "pressure",
            reason: "\"high\" is not a number".to_string(),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.reason(), "Invalid data format");
    }

    #[test]
    fn test_storage_maps_to_server_error() {
        let err = ApiError::from(StorageError::Write(sqlx_error()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.reason(), "Failed to store data");

        let err = ApiError::from(StorageError::Query(sqlx_error()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.reason(), "Database error");
    }

    #[test]
    fn test_panic_response_hides_detail() {
        let response = handle_panic(Box::new("secret path /etc/passwd"));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    fn sqlx_error() -> storage::SqlxError {
        storage::SqlxError::PoolClosed
    }
}
