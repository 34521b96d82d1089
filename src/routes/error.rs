//! Response envelope and error type shared by every API route.
//!
//! Success bodies are `{"success": true, "data": ...}`; failures are
//! `{"success": false, "error": "..."}` with a matching status code. Each
//! route module maps its service error into [`ApiError`] with one
//! `*_error` function; database and storage details are logged here and
//! replaced by a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use onboarding::ApiResponse;
use serde::Serialize;

use crate::services::access::AccessError;

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

/// Wrap `data` in a success envelope.
#[allow(clippy::unnecessary_wraps)]
pub fn ok<T: Serialize>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse::ok(data)))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    #[must_use]
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self { status, message: message.into() }
    }

    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "authentication required")
    }

    #[must_use]
    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden")
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    /// Log `error` and answer with an opaque 500.
    pub fn internal(error: &dyn std::error::Error) -> Self {
        tracing::error!(error = %error, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

pub fn access_error(e: AccessError) -> ApiError {
    match e {
        AccessError::NotFound(_) => ApiError::not_found("client not found"),
        AccessError::Forbidden => ApiError::forbidden(),
        AccessError::Database(e) => ApiError::internal(&e),
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
