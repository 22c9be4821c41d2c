//! Proxy error types with structured JSON responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
}

/// Proxy errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("URL is required")]
    UrlRequired,
    #[error("Invalid target URL: {0}")]
    InvalidTarget(String),
    #[error("Failed to fetch URL: {reason}")]
    UpstreamStatus { status: u16, reason: String },
    #[error("Server error: {0}")]
    UpstreamUnreachable(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::UrlRequired => (
                StatusCode::BAD_REQUEST,
                "URL_REQUIRED",
                "URL is required".to_string(),
            ),
            ApiError::InvalidTarget(detail) => (
                StatusCode::BAD_REQUEST,
                "INVALID_TARGET",
                format!("Only http and https targets are allowed: {detail}"),
            ),
            ApiError::UpstreamStatus { status, reason } => (
                StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
                "UPSTREAM_STATUS",
                format!("Failed to fetch URL: {reason}"),
            ),
            ApiError::UpstreamUnreachable(detail) => {
                tracing::warn!(detail, "Proxy upstream unreachable");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "UPSTREAM_UNREACHABLE",
                    format!("Server error: {detail}"),
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "Proxy internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };

        (status, Json(body)).into_response()
    }
}
