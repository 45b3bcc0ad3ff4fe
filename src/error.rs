/// Unified error types for the Memoria admin service
use crate::admin::permissions::Permission;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for administrative operations
#[derive(Error, Debug)]
pub enum AdminError {
    /// Bad login. The message never reveals whether the account exists.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Session missing or past its lifetime
    #[error("Session expired, please sign in again")]
    SessionExpired,

    /// Capability not granted to the current session
    #[error("Permission denied: requires {}", permission.as_str())]
    PermissionDenied { permission: Permission },

    /// Status edge not present in the entity's transition table
    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Concurrent write detected (version mismatch or duplicate id)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored document could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AdminError {
    /// Stable machine-readable code used in HTTP bodies and notifications
    pub fn code(&self) -> &'static str {
        match self {
            AdminError::InvalidCredentials => "InvalidCredentials",
            AdminError::SessionExpired => "SessionExpired",
            AdminError::PermissionDenied { .. } => "PermissionDenied",
            AdminError::InvalidTransition { .. } => "InvalidTransition",
            AdminError::Validation(_) => "ValidationError",
            AdminError::Conflict(_) => "ConflictError",
            AdminError::NotFound(_) => "NotFound",
            AdminError::RateLimitExceeded { .. } => "RateLimitExceeded",
            AdminError::Database(_)
            | AdminError::Serialization(_)
            | AdminError::Io(_)
            | AdminError::Internal(_) => "InternalServerError",
        }
    }
}

impl From<validator::ValidationErrors> for AdminError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AdminError::Validation(errors.to_string())
    }
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert AdminError to HTTP response
impl IntoResponse for AdminError {
    fn into_response(self) -> Response {
        let status = match &self {
            AdminError::InvalidCredentials | AdminError::SessionExpired => StatusCode::UNAUTHORIZED,
            AdminError::PermissionDenied { .. } => StatusCode::FORBIDDEN,
            AdminError::InvalidTransition { .. } | AdminError::Conflict(_) => StatusCode::CONFLICT,
            AdminError::Validation(_) => StatusCode::BAD_REQUEST,
            AdminError::NotFound(_) => StatusCode::NOT_FOUND,
            AdminError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            AdminError::Database(_)
            | AdminError::Serialization(_)
            | AdminError::Io(_)
            | AdminError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("Request failed: {}", self);
            "Internal server error".to_string() // Don't leak details
        } else {
            self.to_string()
        };

        let body = Json(ErrorResponse {
            error: self.code().to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for admin operations
pub type AdminResult<T> = Result<T, AdminError>;
