//! Error envelope shared by every HTTP handler.
//!
//! DESIGN
//! ======
//! Services return their own `thiserror` enums. Handlers map those into an
//! `ApiError`, which renders the JSON envelope clients parse:
//! `{error, message, details, timestamp}`. Every service error also carries a
//! grepable `E_*` code and a retryable flag through [`ErrorCode`] so logs and
//! clients can tell transient provider failures from caller mistakes.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retryable flag for structured error responses.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// REQUEST ID
// =============================================================================

tokio::task_local! {
    /// ID the request-context middleware stamps on the request being handled.
    pub static REQUEST_ID: String;
}

/// The current request's ID, or a fresh one outside a request scope.
#[must_use]
pub fn current_request_id() -> String {
    REQUEST_ID
        .try_with(Clone::clone)
        .unwrap_or_else(|_| Uuid::new_v4().to_string())
}

// =============================================================================
// RESPONSE ENVELOPE
// =============================================================================

/// JSON body returned for every non-2xx response.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: &'static str,
    pub message: String,
    pub details: serde_json::Value,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Handler-level error: a status plus the human-readable detail.
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
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    #[must_use]
    pub fn too_many_requests(message: impl Into<String>) -> Self {
        Self::new(StatusCode::TOO_MANY_REQUESTS, message)
    }

    #[must_use]
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(StatusCode::SERVICE_UNAVAILABLE, message)
    }

    /// Log the underlying cause and return a generic 500 with `message`.
    pub fn internal(cause: &(impl ErrorCode + ?Sized), message: impl Into<String>) -> Self {
        tracing::error!(code = cause.error_code(), error = %cause, "request failed");
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Build the envelope for this error.
    #[must_use]
    pub fn body(&self) -> ErrorResponse {
        if self.status == StatusCode::INTERNAL_SERVER_ERROR {
            return ErrorResponse {
                error: "INTERNAL_SERVER_ERROR",
                message: self.message.clone(),
                details: serde_json::json!({ "request_id": current_request_id() }),
                timestamp: OffsetDateTime::now_utc(),
            };
        }
        ErrorResponse {
            error: "HTTP_ERROR",
            message: self.message.clone(),
            details: serde_json::json!({ "status_code": self.status.as_u16() }),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.message)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status, Json(self.body())).into_response();
        if self.status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<crate::rate_limit::RateLimitError> for ApiError {
    fn from(e: crate::rate_limit::RateLimitError) -> Self {
        tracing::warn!(error = %e, "rate limit hit");
        Self::too_many_requests("Rate limit exceeded")
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
