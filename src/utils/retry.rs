//! Retry wrapper for operations that fail with retryable [`AppError`]s.
//!
//! Only errors where [`AppError::is_retryable`] returns `true` are retried
//! (connection failures, timeouts, serialization conflicts). Any other error is
//! returned after the first call.
//!
//! # Backoff
//!
//! With exponential backoff enabled, the delay before retry `n` (0-based) is
//! `retry_delay * 2^n`; otherwise every retry waits `retry_delay`.

use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use serde::Deserialize;
use tokio_retry::RetryIf;

use crate::error::AppError;

/// Retry policy for database calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct RetryConfig {
    /// Additional attempts after the first call.
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub exponential_backoff: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 200,
            exponential_backoff: true,
        }
    }
}

impl RetryConfig {
    /// A policy that calls the operation exactly once.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Delays slept before each retry, one entry per retry.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + use<> {
        let base = self.retry_delay_ms;
        let exponential = self.exponential_backoff;

        (0..self.max_retries).map(move |attempt| {
            let millis = if exponential {
                let factor = 1u64.checked_shl(attempt).unwrap_or(u64::MAX);
                base.saturating_mul(factor)
            } else {
                base
            };
            Duration::from_millis(millis)
        })
    }
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent.
///
/// Returns the operation's result, or the last error it produced.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &str,
    operation: F,
) -> Result<T, AppError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AppError>>,
{
    let retries = AtomicU32::new(0);
    let max_retries = config.max_retries;

    let result = RetryIf::start(config.delays(), operation, |err: &AppError| {
        if !err.is_retryable() {
            return false;
        }
        let attempt = retries.fetch_add(1, Ordering::Relaxed) + 1;
        if attempt <= max_retries {
            metrics::counter!("database_retries_total", "operation" => operation_name.to_string())
                .increment(1);
            tracing::warn!(
                operation = operation_name,
                attempt,
                max_retries,
                code = %err.code,
                "retryable error, backing off"
            );
        }
        true
    })
    .await;

    if let Err(err) = &result
        && err.is_retryable()
        && max_retries > 0
    {
        tracing::error!(
            operation = operation_name,
            max_retries,
            code = %err.code,
            "retries exhausted"
        );
    }

    result
}
