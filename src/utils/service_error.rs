// API-facing error type: every failure a handler can surface, mapped onto a
// status code and a JSON body.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid URL format")]
    InvalidUrl,

    #[error("Too many requests")]
    RateLimited { retry_after: u64 },

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal server error")]
    InternalError,
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            ServiceError::ValidationError(msg) => (StatusCode::BAD_REQUEST, msg),
            ServiceError::InvalidUrl => {
                (StatusCode::BAD_REQUEST, "Invalid URL format".to_string())
            },
            ServiceError::RateLimited { retry_after } => (
                StatusCode::TOO_MANY_REQUESTS,
                format!("Too many requests. Try again in {} seconds.", retry_after),
            ),
            ServiceError::CacheError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ServiceError::InternalError => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

// Conversion from various error types
impl From<crate::services::store::StoreError> for ServiceError {
    fn from(error: crate::services::store::StoreError) -> Self {
        ServiceError::CacheError(error.to_string())
    }
}

impl From<crate::services::analysis::ScanError> for ServiceError {
    fn from(error: crate::services::analysis::ScanError) -> Self {
        match error {
            crate::services::analysis::ScanError::Malformed(_) => ServiceError::InvalidUrl,
            crate::services::analysis::ScanError::Internal(_) => ServiceError::InternalError,
        }
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(error: validator::ValidationErrors) -> Self {
        ServiceError::ValidationError(error.to_string())
    }
}

impl From<crate::utils::url_normalizer::NormalizeError> for ServiceError {
    fn from(_: crate::utils::url_normalizer::NormalizeError) -> Self {
        ServiceError::InvalidUrl
    }
}
