//! Maps domain `AppError` to HTTP responses.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

use reminder_core::error::{AppError, ErrorKind};

/// Standard API error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    /// Machine-readable error code.
    pub error: String,
    /// Human-readable message.
    pub message: String,
}

/// Error returned from handlers and extractors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl ApiError {
    /// Status code and error code for this error.
    pub fn status(&self) -> (StatusCode, &'static str) {
        match self.0.kind {
            ErrorKind::Validation => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ErrorKind::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ErrorKind::NotFound => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ErrorKind::Conflict => (StatusCode::CONFLICT, "CONFLICT"),
            ErrorKind::ServiceUnavailable => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ErrorKind::Internal
            | ErrorKind::Database
            | ErrorKind::Configuration
            | ErrorKind::Serialization
            | ErrorKind::ExternalService => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
            }
        }
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status();

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(kind = %self.0.kind, error = %self.0.message, "Internal server error");
            "Internal server error".to_string()
        } else {
            self.0.message
        };

        let body = ApiErrorResponse {
            error: error_code.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_map_to_status_codes() {
        let cases = [
            (AppError::validation("bad"), StatusCode::BAD_REQUEST),
            (AppError::unauthorized("who"), StatusCode::UNAUTHORIZED),
            (AppError::not_found("gone"), StatusCode::NOT_FOUND),
            (AppError::conflict("dup"), StatusCode::CONFLICT),
            (
                AppError::service_unavailable("store down"),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AppError::database("boom"), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_internal_details_are_not_leaked() {
        let (status, code) = ApiError(AppError::database("password=hunter2")).status();
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(code, "INTERNAL_ERROR");
    }
}
