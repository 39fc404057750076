//! Classification of PostgreSQL errors into [`AppError`]s.
//!
//! Classification is one-shot: it inspects the SQLSTATE code (and, for unique
//! violations, the detail text) and never retries.

use serde_json::{Map, Value, json};
use sqlx::postgres::PgDatabaseError;

use crate::error::{AppError, ErrorCode};

/// The fields of a Postgres error that classification looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DatabaseErrorInfo {
    /// SQLSTATE code, e.g. `23505`.
    pub code: Option<String>,
    pub message: String,
    pub detail: Option<String>,
    pub constraint: Option<String>,
}

impl DatabaseErrorInfo {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            message: message.into(),
            ..Default::default()
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_constraint(mut self, constraint: impl Into<String>) -> Self {
        self.constraint = Some(constraint.into());
        self
    }

    /// Extracts the Postgres fields from a driver error.
    ///
    /// Returns `None` for errors that did not originate from the database server.
    pub fn from_sqlx(err: &sqlx::Error) -> Option<Self> {
        let db = err.as_database_error()?;
        let detail = db
            .try_downcast_ref::<PgDatabaseError>()
            .and_then(|pg| pg.detail())
            .map(str::to_owned);

        Some(Self {
            code: db.code().map(|c| c.into_owned()),
            message: db.message().to_string(),
            detail,
            constraint: db.constraint().map(str::to_owned),
        })
    }

    fn context(&self) -> Value {
        let mut map = Map::new();
        if let Some(code) = &self.code {
            map.insert("sqlstate".into(), json!(code));
        }
        if let Some(constraint) = &self.constraint {
            map.insert("constraint".into(), json!(constraint));
        }
        Value::Object(map)
    }
}

/// Maps a Postgres error to a typed application error.
///
/// Unknown or missing codes fall back to a generic `DATABASE_ERROR` (500).
pub fn classify_database_error(info: &DatabaseErrorInfo) -> AppError {
    let context = info.context();

    let (code, message) = match info.code.as_deref() {
        Some("23505") => {
            let is_email = info
                .detail
                .as_deref()
                .is_some_and(|d| d.to_ascii_lowercase().contains("email"));
            if is_email {
                (ErrorCode::DuplicateEmail, "A record with this email already exists")
            } else {
                (ErrorCode::Conflict, "Unique constraint violation")
            }
        }
        Some("23503") => (ErrorCode::ValidationError, "Referenced record does not exist"),
        Some("23502") => (ErrorCode::ValidationError, "Required field is missing"),
        Some("23514") => (ErrorCode::ValidationError, "Check constraint violation"),
        Some("22P02" | "22001" | "22003") => (ErrorCode::ValidationError, "Invalid input value"),
        Some("42501") => (
            ErrorCode::InsufficientPrivileges,
            "Insufficient privileges for this operation",
        ),
        Some("28000" | "28P01") => (
            ErrorCode::AuthenticationError,
            "Database authentication failed",
        ),
        Some("08000" | "08001" | "08003" | "08004" | "08006" | "57P01" | "53300") => (
            ErrorCode::DatabaseConnectionError,
            "Database connection failed",
        ),
        Some("57014") => (ErrorCode::DatabaseTimeout, "Database query timed out"),
        Some("40001" | "40P01") => (
            ErrorCode::DatabaseTransientError,
            "Transaction conflict, please retry",
        ),
        _ => (ErrorCode::DatabaseError, "Database error"),
    };

    AppError::new(code, message, context)
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(info) = DatabaseErrorInfo::from_sqlx(&err) {
            let classified = classify_database_error(&info);
            tracing::debug!(
                code = %classified.code,
                sqlstate = info.code.as_deref().unwrap_or("-"),
                message = %info.message,
                "classified database error"
            );
            return classified;
        }

        match &err {
            sqlx::Error::RowNotFound => AppError::not_found("Record not found", json!({})),
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => {
                tracing::warn!("database unreachable: {}", err);
                AppError::database_connection("Database connection failed", json!({}))
            }
            _ => {
                tracing::error!("database error: {}", err);
                AppError::database("Database error", json!({}))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_unique_violation_on_email() {
        let info = DatabaseErrorInfo::new("23505", "duplicate key")
            .with_detail("Key (email)=(a@b.com) already exists.")
            .with_constraint("leads_email_key");

        let err = classify_database_error(&info);

        assert_eq!(err.code, ErrorCode::DuplicateEmail);
        assert_eq!(err.status(), StatusCode::CONFLICT);
        assert_eq!(err.details["constraint"], "leads_email_key");
    }

    #[test]
    fn test_generic_unique_violation() {
        let info = DatabaseErrorInfo::new("23505", "duplicate key")
            .with_detail("Key (domain, entity_id)=(campaigns, c1) already exists.");

        let err = classify_database_error(&info);

        assert_eq!(err.code, ErrorCode::Conflict);
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_unique_violation_without_detail() {
        let err = classify_database_error(&DatabaseErrorInfo::new("23505", "duplicate key"));
        assert_eq!(err.code, ErrorCode::Conflict);
    }

    #[test]
    fn test_foreign_key_violation_is_bad_request() {
        let err = classify_database_error(&DatabaseErrorInfo::new("23503", "fk"));
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_connection_failure_is_retryable() {
        let err = classify_database_error(&DatabaseErrorInfo::new("08006", "connection failure"));
        assert_eq!(err.code, ErrorCode::DatabaseConnectionError);
        assert!(err.is_retryable());
    }

    #[test]
    fn test_privilege_and_auth_codes() {
        let forbidden = classify_database_error(&DatabaseErrorInfo::new("42501", "denied"));
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let auth = classify_database_error(&DatabaseErrorInfo::new("28P01", "bad password"));
        assert_eq!(auth.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_unknown_code_falls_back_to_database_error() {
        let err = classify_database_error(&DatabaseErrorInfo::new("XX999", "weird"));
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_missing_code_falls_back_to_database_error() {
        let info = DatabaseErrorInfo {
            message: "no code".into(),
            ..Default::default()
        };
        assert_eq!(classify_database_error(&info).code, ErrorCode::DatabaseError);
    }

    #[test]
    fn test_sqlx_pool_timeout_maps_to_connection_error() {
        let err: AppError = sqlx::Error::PoolTimedOut.into();
        assert_eq!(err.code, ErrorCode::DatabaseConnectionError);
    }

    #[test]
    fn test_sqlx_row_not_found_maps_to_not_found() {
        let err: AppError = sqlx::Error::RowNotFound.into();
        assert_eq!(err.code, ErrorCode::NotFound);
    }
}
