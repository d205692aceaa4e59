//! Error types for the HTTP layer.
//!
//! [`ApiError`] converts into an Axum response via its
//! [`IntoResponse`](axum::response::IntoResponse) implementation. Relay and
//! broadcast failures never reach this type; only request problems do.

use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

/// Errors returned to HTTP clients.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request body was not valid JSON or lacked required fields.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// No route matches the request.
    #[error("not found: {0}")]
    NotFound(String),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::InvalidRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = serde_json::json!({
            "error": message,
            "status": status.as_u16(),
        });

        (status, axum::Json(body)).into_response()
    }
}
