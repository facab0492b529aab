//! API error types and HTTP response mapping.

use axum::http::header::HeaderName;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use utoipa::ToSchema;

use siren_core::error::Error as CoreError;

/// API result type.
pub type ApiResult<T> = Result<T, ApiError>;

/// Standard JSON error response body.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorBody {
    /// Stable machine-readable error code.
    pub code: String,
    /// Human-readable message (safe for clients).
    pub message: String,
    /// Optional request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// HTTP API error with stable machine-readable code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
    request_id: Option<String>,
}

impl ApiError {
    /// Returns an error response for invalid input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "BAD_REQUEST", message)
    }

    /// Returns an error response for authentication failures.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "UNAUTHORIZED", message)
    }

    /// Returns an error response for authorization failures.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "FORBIDDEN", message)
    }

    /// Returns an error response for missing resources.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    /// Returns an error response for state conflicts (invalid transitions).
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, "CONFLICT", message)
    }

    /// Returns an error response for failed upstream collaborators.
    pub fn bad_gateway(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_GATEWAY, "UPSTREAM_UNAVAILABLE", message)
    }

    /// Returns an error response for retryable backend failures.
    pub fn unavailable(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            code,
            message: message.into(),
            request_id: None,
        }
    }

    /// Returns an internal error response.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", message)
    }

    /// Attaches a request ID for correlation.
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }

    /// Returns the human-readable error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            request_id: None,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match &err {
            CoreError::Validation { .. } | CoreError::InvalidId { .. } => {
                Self::bad_request(err.to_string())
            }
            CoreError::Forbidden { .. } => Self::forbidden(err.to_string()),
            CoreError::NotFound { .. } => Self::not_found(err.to_string()),
            CoreError::InvalidTransition { .. } => Self::conflict(err.to_string()),
            CoreError::IdentityAllocation { .. } => {
                Self::unavailable("IDENTITY_ALLOCATION_FAILED", err.to_string())
            }
            CoreError::Storage { .. } => Self::unavailable("STORE_WRITE_FAILED", err.to_string()),
            CoreError::Upstream { .. } => Self::bad_gateway(err.to_string()),
            CoreError::Serialization { .. } | CoreError::Internal { .. } => {
                // Details stay in the logs; clients get a generic response.
                tracing::error!(error = %err, "internal error reached the API boundary");
                Self::internal("internal error")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = self.request_id;
        let mut response = (
            self.status,
            Json(ApiErrorBody {
                code: self.code.to_string(),
                message: self.message,
                request_id: request_id.clone(),
            }),
        )
            .into_response();

        if let Some(request_id) = request_id {
            if let Ok(value) = HeaderValue::from_str(&request_id) {
                response
                    .headers_mut()
                    .insert(HeaderName::from_static("x-request-id"), value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_stable_codes() {
        let cases = [
            (CoreError::validation("x"), StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            (CoreError::forbidden("x"), StatusCode::FORBIDDEN, "FORBIDDEN"),
            (
                CoreError::not_found("request", "y"),
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
            ),
            (
                CoreError::invalid_transition("cancelled", "addressed"),
                StatusCode::CONFLICT,
                "CONFLICT",
            ),
            (
                CoreError::identity_allocation("x"),
                StatusCode::SERVICE_UNAVAILABLE,
                "IDENTITY_ALLOCATION_FAILED",
            ),
            (
                CoreError::storage("x"),
                StatusCode::SERVICE_UNAVAILABLE,
                "STORE_WRITE_FAILED",
            ),
            (
                CoreError::upstream("x"),
                StatusCode::BAD_GATEWAY,
                "UPSTREAM_UNAVAILABLE",
            ),
        ];

        for (core, status, code) in cases {
            let api = ApiError::from(core);
            assert_eq!(api.status(), status);
            assert_eq!(api.code(), code);
        }
    }

    #[test]
    fn internal_details_are_not_leaked() {
        let api = ApiError::from(CoreError::internal("lock poisoned at foo.rs:42"));
        assert_eq!(api.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.message(), "internal error");
    }
}
