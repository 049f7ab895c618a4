//! Centralized API error handling for MarkChain
//!
//! A unified error type for API responses with HTTP status code mapping and
//! JSON error bodies.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::auth::AuthError;
use crate::services::UserError;

/// API error type with HTTP status code mapping
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid wallet address: {0}")]
    InvalidAddress(String),

    #[error("Invalid signature format: {0}")]
    InvalidSignature(String),

    #[error("Authentication failed")]
    AuthenticationFailed,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token has expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),
}

/// JSON error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

/// Error details in the response
#[derive(Serialize)]
pub struct ErrorDetails {
    pub code: String,
    pub message: String,
}

impl ApiError {
    /// Get the error code string
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::BadRequest(_) => "BAD_REQUEST",
            ApiError::InvalidAddress(_) => "INVALID_ADDRESS",
            ApiError::InvalidSignature(_) => "INVALID_SIGNATURE_FORMAT",
            ApiError::AuthenticationFailed => "AUTHENTICATION_FAILED",
            ApiError::Unauthorized(_) => "UNAUTHORIZED",
            ApiError::TokenExpired => "TOKEN_EXPIRED",
            ApiError::InvalidToken => "INVALID_TOKEN",
            ApiError::Forbidden(_) => "FORBIDDEN",
            ApiError::TooManyRequests => "TOO_MANY_REQUESTS",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::ValidationError(_) => "VALIDATION_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_)
            | ApiError::InvalidAddress(_)
            | ApiError::InvalidSignature(_)
            | ApiError::ValidationError(_) => StatusCode::BAD_REQUEST,
            ApiError::AuthenticationFailed
            | ApiError::Unauthorized(_)
            | ApiError::TokenExpired
            | ApiError::InvalidToken => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            ApiError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Internal details stay in the logs
        let message = match &self {
            ApiError::InternalError(detail) => {
                tracing::error!(error = %detail, code = %error_code, "Server error occurred");
                "Internal server error".to_string()
            }
            _ => {
                tracing::debug!(error = %self, code = %error_code, "Client error occurred");
                self.to_string()
            }
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code: error_code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_authentication_failure() {
            // one response for every outcome failure; the kind is only logged
            tracing::warn!(kind = err.kind(), error = %err, "Authentication failed");
            return ApiError::AuthenticationFailed;
        }

        match err {
            AuthError::InvalidAddress(msg) => ApiError::InvalidAddress(msg),
            AuthError::InvalidSignatureFormat(msg) => ApiError::InvalidSignature(msg),
            AuthError::TokenExpired => ApiError::TokenExpired,
            AuthError::TokenInvalid(_) => ApiError::InvalidToken,
            AuthError::IdentityNotFound => ApiError::NotFound("Identity not found".to_string()),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::InvalidAddress(msg) => ApiError::InvalidAddress(msg),
            UserError::NotFound(_) => ApiError::NotFound(err.to_string()),
            UserError::Forbidden => ApiError::Forbidden(err.to_string()),
            UserError::Store(msg) => ApiError::InternalError(msg),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::ValidationError(err.to_string())
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;
