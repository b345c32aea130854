use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use clockface_store::StoreError;
use serde_json::json;
use thiserror::Error;

/// Request-level failure, mapped to the wire contract's status codes and
/// response envelope.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed request body; per-field errors in the payload.
    #[error("Validation failed")]
    Validation { errors: serde_json::Value },

    /// Structurally valid body carrying an unusable descriptor.
    #[error("{0}")]
    InvalidDescriptor(String),

    #[error("No face descriptors registered in the system")]
    NoEnrollment,

    #[error("No matching face found in the system")]
    NoMatch,

    #[error("Attendance already recorded for today")]
    AlreadyComplete,

    #[error("Missing or invalid API token")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Anything the caller cannot act on. `context` is the endpoint's
    /// "Failed to ..." message; `detail` is echoed in the `error` field.
    #[error("{context}: {detail}")]
    Internal { context: &'static str, detail: String },
}

impl ApiError {
    /// Wrap a store failure for a given endpoint context. Stored-data
    /// invariant violations are logged here with full detail; the client
    /// only sees the generic message.
    pub fn internal(context: &'static str) -> impl FnOnce(StoreError) -> ApiError {
        move |err| {
            let detail = match &err {
                StoreError::CorruptDescriptor { user_id, .. } => {
                    tracing::error!(user_id, error = %err, "stored descriptor invariant violated");
                    "internal data integrity error".to_string()
                }
                other => other.to_string(),
            };
            ApiError::Internal { context, detail }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::Validation { errors } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({
                    "success": false,
                    "message": "Validation failed",
                    "errors": errors,
                }),
            ),
            ApiError::InvalidDescriptor(message) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                json!({ "success": false, "message": message }),
            ),
            ApiError::NoEnrollment | ApiError::NoMatch => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": self.to_string() }),
            ),
            ApiError::AlreadyComplete => (
                StatusCode::CONFLICT,
                json!({ "success": false, "message": self.to_string() }),
            ),
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                json!({ "success": false, "message": self.to_string() }),
            ),
            ApiError::Forbidden(message) => (
                StatusCode::FORBIDDEN,
                json!({ "success": false, "message": message }),
            ),
            ApiError::NotFound(message) => (
                StatusCode::NOT_FOUND,
                json!({ "success": false, "message": message }),
            ),
            ApiError::Internal { context, detail } => {
                tracing::error!(context, error = %detail, "request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    json!({ "success": false, "message": context, "error": detail }),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Shorthand for the single-field validation envelope used by body checks.
pub fn field_errors(field: &str, messages: &[&str]) -> ApiError {
    ApiError::Validation {
        errors: json!({ field: messages }),
    }
}
