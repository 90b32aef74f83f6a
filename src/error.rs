//! Error handling module
//!
//! Centralized error types and HTTP response conversion.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::domain::DomainError;
use crate::store::StoreError;

/// Application-wide Result type
pub type AppResult<T> = Result<T, AppError>;

/// Application error types
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    // Client errors (4xx)
    #[error("Invalid username or password")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Authentication required")]
    Unauthorized,

    #[error("Missing required header: {0}")]
    MissingHeader(String),

    #[error("Withdrawal rejected for account {account_no}")]
    WithdrawalRejected { account_no: String },

    // Domain errors
    #[error(transparent)]
    Domain(#[from] DomainError),

    // Server errors (5xx)
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl AppError {
    fn status_and_code(&self) -> (StatusCode, &'static str, Option<String>) {
        match self {
            // 400 Bad Request
            AppError::InvalidCredentials => (StatusCode::BAD_REQUEST, "invalid_credentials", None),
            AppError::InvalidToken => (StatusCode::BAD_REQUEST, "invalid_token", None),
            AppError::MissingHeader(header) => {
                (StatusCode::BAD_REQUEST, "missing_header", Some(header.clone()))
            }
            AppError::WithdrawalRejected { account_no } => (
                StatusCode::BAD_REQUEST,
                "withdrawal_rejected",
                Some(account_no.clone()),
            ),

            // 401 Unauthorized
            AppError::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),

            AppError::Domain(domain_err) => match domain_err {
                DomainError::Validation(msg) => {
                    (StatusCode::BAD_REQUEST, "validation_error", Some(msg.clone()))
                }
                DomainError::NotFound { id, .. } => {
                    (StatusCode::NOT_FOUND, "not_found", Some(id.clone()))
                }
                DomainError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", Some(msg.clone())),
            },

            // Store errors caused by the request map like their domain twins
            AppError::Store(StoreError::DuplicateEmail(email)) => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(email.clone()))
            }
            AppError::Store(StoreError::OutOfRange(msg)) => {
                (StatusCode::BAD_REQUEST, "validation_error", Some(msg.clone()))
            }
            AppError::Store(StoreError::MissingCustomer(id)) => {
                (StatusCode::NOT_FOUND, "not_found", Some(id.to_string()))
            }
            AppError::Store(StoreError::CustomerInUse(id)) => {
                (StatusCode::CONFLICT, "conflict", Some(id.to_string()))
            }

            // 500 Internal Server Error
            AppError::Store(e) => {
                tracing::error!("Store error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "database_error", None)
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", None)
            }
            AppError::Config(e) => {
                tracing::error!("Config error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "config_error", None)
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status_and_code().0
    }
}

/// Malformed request bodies are validation failures
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Domain(DomainError::validation(rejection.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        if rejection.status().is_server_error() {
            AppError::Internal(rejection.body_text())
        } else {
            AppError::Domain(DomainError::validation(rejection.body_text()))
        }
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Domain(DomainError::validation(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_code, details) = self.status_and_code();

        // Server-side failures never leak their internals
        let error = if status.is_server_error() {
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = ErrorResponse {
            error,
            error_code: error_code.to_string(),
            details,
        };

        (status, Json(body)).into_response()
    }
}
