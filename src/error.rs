//! Application error taxonomy and the JSON error envelope.
//!
//! Every failure that reaches an HTTP handler is an [`AppError`]: a stable
//! [`ErrorCode`], a human-readable message, optional structured details and
//! the moment the error was classified. Low-level backend errors are converted
//! once, close to the failing call (see [`crate::utils::db_error`]).

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};
use std::fmt;

/// Stable error codes exposed to API clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    AuthenticationError,
    InsufficientPrivileges,
    NotFound,
    Conflict,
    DuplicateEmail,
    DatabaseConnectionError,
    DatabaseTimeout,
    DatabaseTransientError,
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// HTTP status associated with the code.
    pub fn status(self) -> StatusCode {
        match self {
            Self::ValidationError => StatusCode::BAD_REQUEST,
            Self::AuthenticationError => StatusCode::UNAUTHORIZED,
            Self::InsufficientPrivileges => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict | Self::DuplicateEmail => StatusCode::CONFLICT,
            Self::DatabaseConnectionError
            | Self::DatabaseTimeout
            | Self::DatabaseTransientError
            | Self::DatabaseError
            | Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::AuthenticationError => "AUTHENTICATION_ERROR",
            Self::InsufficientPrivileges => "INSUFFICIENT_PRIVILEGES",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::DuplicateEmail => "DUPLICATE_EMAIL",
            Self::DatabaseConnectionError => "DATABASE_CONNECTION_ERROR",
            Self::DatabaseTimeout => "DATABASE_TIMEOUT",
            Self::DatabaseTransientError => "DATABASE_TRANSIENT_ERROR",
            Self::DatabaseError => "DATABASE_ERROR",
            Self::InternalError => "INTERNAL_ERROR",
        }
    }

    /// Whether an operation failing with this code may succeed if repeated.
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::DatabaseConnectionError | Self::DatabaseTimeout | Self::DatabaseTransientError
        )
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified application error.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct AppError {
    pub code: ErrorCode,
    pub message: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>, details: Value) -> Self {
        Self {
            code,
            message: message.into(),
            details,
            timestamp: Utc::now(),
        }
    }

    pub fn bad_request(message: impl Into<String>, details: Value) -> Self {
        Self::new(ErrorCode::ValidationError, message, details)
    }

    pub fn not_found(message: impl Into<String>, details: Value) -> Self {
        Self::new(ErrorCode::NotFound, message, details)
    }

    pub fn conflict(message: impl Into<String>, details: Value) -> Self {
        Self::new(ErrorCode::Conflict, message, details)
    }

    pub fn internal(message: impl Into<String>, details: Value) -> Self {
        Self::new(ErrorCode::InternalError, message, details)
    }

    pub fn database(message: impl Into<String>, details: Value) -> Self {
        Self::new(ErrorCode::DatabaseError, message, details)
    }

    pub fn database_connection(message: impl Into<String>, details: Value) -> Self {
        Self::new(ErrorCode::DatabaseConnectionError, message, details)
    }

    pub fn status(&self) -> StatusCode {
        self.code.status()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Connection-class failures: the backend could not be reached at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self.code,
            ErrorCode::DatabaseConnectionError | ErrorCode::DatabaseTimeout
        )
    }

    /// Serializes the error into the body placed under `"error"` in the envelope.
    pub fn to_info(&self) -> ErrorInfo {
        ErrorInfo {
            code: self.code,
            message: self.message.clone(),
            status_code: self.status().as_u16(),
            timestamp: self.timestamp,
            details: self.details.clone(),
        }
    }
}

/// JSON representation of an [`AppError`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorInfo {
    pub code: ErrorCode,
    pub message: String,
    pub status_code: u16,
    pub timestamp: DateTime<Utc>,
    pub details: Value,
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: ErrorInfo,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            tracing::error!(code = %self.code, message = %self.message, "request failed");
        } else {
            tracing::debug!(code = %self.code, message = %self.message, "request rejected");
        }

        let body = ErrorBody {
            success: false,
            error: self.to_info(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let details = serde_json::to_value(&errors).unwrap_or_else(|_| json!({}));
        AppError::bad_request("Validation failed", details)
    }
}

macro_rules! rejection_into_app_error {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for AppError {
                fn from(rejection: $rejection) -> Self {
                    AppError::bad_request(
                        rejection.body_text(),
                        json!({ "status": rejection.status().as_u16() }),
                    )
                }
            }
        )*
    };
}

rejection_into_app_error!(JsonRejection, QueryRejection, PathRejection);
