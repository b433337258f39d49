use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use plex_dubs_core::ProcessError;
use plex_dubs_sources::PayloadError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed webhook body (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Event for a library kind with no Plex library configured (500)
    #[error("{0}")]
    LibraryNotConfigured(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<PayloadError> for ApiError {
    fn from(err: PayloadError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<ProcessError> for ApiError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::LibraryNotConfigured(_) => ApiError::LibraryNotConfigured(err.to_string()),
            ProcessError::External(_) => ApiError::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::LibraryNotConfigured(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "LIBRARY_NOT_CONFIGURED",
                msg,
            ),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg),
        };

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
