// SPDX-License-Identifier: MIT

//! Application error types with consistent API responses.
//!
//! Every error surfaces to clients as `{error, code}` JSON, with the
//! machine-readable codes the frontend maps to user-facing messages.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Machine-readable error codes returned in the `code` field.
pub mod codes {
    pub const MISSING_EMAIL: &str = "MISSING_EMAIL";
    pub const INVALID_EMAIL_FORMAT: &str = "INVALID_EMAIL_FORMAT";
    pub const USER_NOT_FOUND: &str = "USER_NOT_FOUND";
    pub const RATE_LIMIT_EXCEEDED: &str = "RATE_LIMIT_EXCEEDED";
    pub const MISSING_TOKEN: &str = "MISSING_TOKEN";
    pub const TOKEN_NOT_FOUND: &str = "TOKEN_NOT_FOUND";
    pub const TOKEN_EXPIRED: &str = "TOKEN_EXPIRED";
    pub const TOKEN_USED: &str = "TOKEN_USED";
    pub const MISSING_FIELDS: &str = "MISSING_FIELDS";
    pub const WEAK_PASSWORD: &str = "WEAK_PASSWORD";
    pub const OCCURRENCE_NOT_FOUND: &str = "OCCURRENCE_NOT_FOUND";
    pub const CONSENT_REQUIRED: &str = "CONSENT_REQUIRED";
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}

/// Application error type that converts to HTTP responses.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    /// Consent gate: the user must (re-)accept the current policy version.
    #[error("Consent required for the current policy version")]
    ConsentRequired,

    /// Malformed input, surfaced with a field-level message.
    #[error("Invalid request: {message}")]
    Validation {
        code: &'static str,
        message: String,
    },

    #[error("Not found: {message}")]
    NotFound {
        code: &'static str,
        message: String,
    },

    /// Token past its lifecycle (expired or already consumed).
    #[error("Gone: {message}")]
    Gone {
        code: &'static str,
        message: String,
    },

    #[error("Too many requests")]
    RateLimited,

    #[error("Database error: {0}")]
    Database(String),

    /// Identity-provider or other upstream failure. Detail is logged
    /// server-side; clients get a generic internal error.
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn validation(code: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(code: &'static str, message: impl Into<String>) -> Self {
        Self::NotFound {
            code,
            message: message.into(),
        }
    }

    pub fn gone(code: &'static str, message: impl Into<String>) -> Self {
        Self::Gone {
            code,
            message: message.into(),
        }
    }

    /// The `code` this error serializes with.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => codes::UNAUTHORIZED,
            AppError::ConsentRequired => codes::CONSENT_REQUIRED,
            AppError::Validation { code, .. } => code,
            AppError::NotFound { code, .. } => code,
            AppError::Gone { code, .. } => code,
            AppError::RateLimited => codes::RATE_LIMIT_EXCEEDED,
            AppError::Database(_) | AppError::Upstream(_) | AppError::Internal(_) => {
                codes::INTERNAL_ERROR
            }
        }
    }
}

/// JSON error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    code: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match &self {
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, self.to_string()),
            AppError::ConsentRequired => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Validation { message, .. } => (StatusCode::BAD_REQUEST, message.clone()),
            AppError::NotFound { message, .. } => (StatusCode::NOT_FOUND, message.clone()),
            AppError::Gone { message, .. } => (StatusCode::GONE, message.clone()),
            AppError::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                "Too many attempts. Try again in 15 minutes.".to_string(),
            ),
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Upstream(msg) => {
                tracing::error!(error = %msg, "Upstream provider error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = ErrorResponse {
            error,
            code: self.code().to_string(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
