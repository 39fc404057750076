//! Cross-cutting helpers for database access.
//!
//! - [`db_error`] - Classification of Postgres errors into application errors
//! - [`retry`] - Retry wrapper with optional exponential backoff

pub mod db_error;
pub mod retry;
