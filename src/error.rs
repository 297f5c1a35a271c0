// SPDX-License-Identifier: MIT

//! Application error types and the uniform API response envelope.
//!
//! Every JSON response (success or failure) uses the same shape:
//! `{success, data, error, code}` so the mobile client can switch on
//! `code` without sniffing status lines.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Uniform response envelope shared by all handlers.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub code: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap a successful payload in the envelope.
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        })
    }
}

/// Application error type that converts to enveloped HTTP responses.
///
/// Authentication failures (401) carry distinct codes because the client
/// behaves differently per code: `TOKEN_EXPIRED` triggers a silent
/// re-login prompt, `INVALID_TOKEN` a hard logout.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("No authentication token provided")]
    NoToken,

    #[error("Invalid authentication token")]
    InvalidToken,

    #[error("Authentication token has expired")]
    TokenExpired,

    #[error("User account no longer exists")]
    UserNotFound,

    #[error("You do not have access to this resource")]
    AccessDenied,

    #[error("Account already exists for {0}")]
    UserExists(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Too many requests")]
    RateLimited,

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Machine-readable code placed in the envelope's `code` field.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::NoToken => "NO_TOKEN",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::TokenExpired => "TOKEN_EXPIRED",
            AppError::UserNotFound => "USER_NOT_FOUND",
            AppError::AccessDenied => "ACCESS_DENIED",
            AppError::UserExists(_) => "USER_EXISTS",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::RateLimited => "RATE_LIMITED",
            AppError::Database(_) => "DATABASE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized
            | AppError::NoToken
            | AppError::InvalidToken
            | AppError::TokenExpired
            | AppError::UserNotFound
            | AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::AccessDenied => StatusCode::FORBIDDEN,
            AppError::UserExists(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let code = self.code();

        // 5xx details go to the log, not to the client. Debug builds keep
        // the message in the envelope for local troubleshooting.
        let message = match &self {
            AppError::Database(msg) => {
                tracing::error!(error = %msg, "Database error");
                if cfg!(debug_assertions) {
                    format!("Database error: {}", msg)
                } else {
                    "Internal server error".to_string()
                }
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "Internal server error");
                if cfg!(debug_assertions) {
                    err.to_string()
                } else {
                    "Internal server error".to_string()
                }
            }
            other => other.to_string(),
        };

        let body: ApiResponse<serde_json::Value> = ApiResponse {
            success: false,
            data: None,
            error: Some(message),
            code: Some(code.to_string()),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias for handlers
pub type Result<T> = std::result::Result<T, AppError>;
