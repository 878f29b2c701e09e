// ============================
// crates/backend-lib/src/error.rs
// ============================
//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::auth::directory::DirectoryError;
use crate::auth::password::PasswordError;

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Malformed password hash")]
    MalformedHash,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Forbidden")]
    Forbidden,

    #[error("Identity already registered: {0}")]
    Conflict(String),

    #[error("Authentication rate limit exceeded")]
    AuthRateLimited,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidInput(_) | AppError::MalformedHash => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::AuthRateLimited => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "VAL_001",
            AppError::MalformedHash => "VAL_002",
            AppError::InvalidCredentials => "AUTH_001",
            AppError::Unauthenticated => "AUTH_002",
            AppError::AuthRateLimited => "AUTH_003",
            AppError::Forbidden => "AUTHZ_001",
            AppError::Conflict(_) => "ACC_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for the client.
    ///
    /// Parsing and lookup details never leave the process.
    pub fn sanitized_message(&self) -> &'static str {
        match self {
            AppError::InvalidInput(_) => "Invalid input provided",
            AppError::MalformedHash => "Invalid hash format",
            AppError::InvalidCredentials => "Authentication failed",
            AppError::Unauthenticated => "Authentication required",
            AppError::AuthRateLimited => {
                "Too many authentication attempts, please try again later"
            },
            AppError::Forbidden => "Access denied",
            AppError::Conflict(_) => "Identity already registered",
            AppError::Internal(_) => "An internal server error occurred",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let body = serde_json::json!({
            "error": {
                "code": self.error_code(),
                "message": self.sanitized_message(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<PasswordError> for AppError {
    fn from(err: PasswordError) -> Self {
        match err {
            PasswordError::InvalidInput => AppError::InvalidInput("empty secret".to_string()),
            PasswordError::MalformedHash => AppError::MalformedHash,
            PasswordError::Hashing(msg) => AppError::Internal(msg),
            PasswordError::Worker(msg) => AppError::Internal(msg),
        }
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::Conflict(identity) => AppError::Conflict(identity),
            DirectoryError::NotFound(identity) => {
                AppError::Internal(format!("credential record vanished for {identity}"))
            },
        }
    }
}
