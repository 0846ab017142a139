//! HTTP error mapping for mixreview-server
//!
//! Every failure leaves the server as `{"error": {"code", "message"}}` with a
//! status code from the shared taxonomy. Storage and database details are
//! logged and replaced with a generic message.

use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use mixreview_common::Error;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Domain error from any layer
    #[error(transparent)]
    Common(#[from] Error),

    /// Malformed multipart upload body (400)
    #[error("Invalid upload: {0}")]
    Multipart(String),
}

impl ApiError {
    pub fn not_found(msg: impl Into<String>) -> Self {
        ApiError::Common(Error::NotFound(msg.into()))
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        ApiError::Common(Error::BadRequest(msg.into()))
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        ApiError::Common(Error::Unauthorized(msg.into()))
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        ApiError::Common(Error::Forbidden(msg.into()))
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Common(Error::Database(err))
    }
}

impl From<std::io::Error> for ApiError {
    fn from(err: std::io::Error) -> Self {
        ApiError::Common(Error::Io(err))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::Multipart(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::Multipart(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            ApiError::Common(err) => {
                let code = err.kind();
                match err {
                    Error::NotFound(msg) => (StatusCode::NOT_FOUND, code, msg),
                    Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, code, msg),
                    Error::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, code, msg),
                    Error::Forbidden(msg) => (StatusCode::FORBIDDEN, code, msg),
                    other => {
                        error!("Request failed: {}", other);
                        (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            "INTERNAL_ERROR",
                            "Internal server error".to_string(),
                        )
                    }
                }
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers and services
pub type ApiResult<T> = Result<T, ApiError>;
