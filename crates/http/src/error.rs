//! Error handling for the bookshelf HTTP layer

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Standard error response format for all HTTP errors
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: u16,
    pub message: &'static str,
}

/// Application error types that map to HTTP responses.
///
/// The `reason` carried by each variant is logged, never sent to the client;
/// clients only ever see the fixed message for the status code.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("not found: {reason}")]
    NotFound { reason: String },

    #[error("bad request: {reason}")]
    BadRequest { reason: String },

    #[error("unprocessable: {reason}")]
    Unprocessable { reason: String },

    #[error("method not allowed")]
    MethodNotAllowed,

    #[error("request timed out")]
    Timeout,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Create a not found error
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self::NotFound {
            reason: reason.into(),
        }
    }

    /// Create a bad request error
    pub fn bad_request(reason: impl Into<String>) -> Self {
        Self::BadRequest {
            reason: reason.into(),
        }
    }

    /// Create an unprocessable entity error
    pub fn unprocessable(reason: impl Into<String>) -> Self {
        Self::Unprocessable {
            reason: reason.into(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            AppError::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::Timeout => StatusCode::REQUEST_TIMEOUT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client-facing message for this error's status code.
    pub fn message(&self) -> &'static str {
        match self {
            AppError::NotFound { .. } => "Resource not found",
            AppError::BadRequest { .. } => "Bad request",
            AppError::Unprocessable { .. } => "Unprocessable",
            // Historical wording of the 405 body.
            AppError::MethodNotAllowed => "Not found",
            AppError::Timeout => "Request timeout",
            AppError::Internal(_) => "Internal server error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let error_id = Uuid::now_v7();
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                error = %self,
                "Request error"
            );
        } else {
            tracing::warn!(
                error_id = %error_id,
                status_code = %status.as_u16(),
                error = %self,
                "Request error"
            );
        }

        let body = ErrorBody {
            success: false,
            error: status.as_u16(),
            message: self.message(),
        };

        (status, Json(body)).into_response()
    }
}

/// Fallback for paths no route matches.
pub async fn not_found_fallback() -> AppError {
    AppError::not_found("no route for path")
}

/// Fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed_fallback() -> AppError {
    AppError::MethodNotAllowed
}

/// Give the timeout layer's empty 408 the standard error body.
pub async fn timeout_body(response: Response) -> Response {
    if response.status() == StatusCode::REQUEST_TIMEOUT {
        return AppError::Timeout.into_response();
    }
    response
}
