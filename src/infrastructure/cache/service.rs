//! Cache service trait, error type and typed helpers.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::fmt;

use super::keys::CacheKeyBuilder;
use crate::domain::entities::AnalyticsDomain;

/// Errors that can occur while setting up a cache backend.
///
/// Operations on an established backend never return errors; see [`CacheService`].
#[derive(Debug)]
pub enum CacheError {
    ConnectionError(String),
    OperationError(String),
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::ConnectionError(e) => write!(f, "Cache connection error: {}", e),
            Self::OperationError(e) => write!(f, "Cache operation error: {}", e),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache setup.
pub type CacheResult<T> = Result<T, CacheError>;

/// Key-value cache with TTLs and glob-pattern deletion.
///
/// Every operation is fail-open: a backend failure is logged and reported as
/// a miss (`None`), a failed write (`false`) or zero deleted keys. The service
/// stays fully functional, just uncached, when the backend is absent or failing.
///
/// # Implementations
///
/// - [`crate::infrastructure::cache::RedisCache`] - Redis-backed cache
/// - [`crate::infrastructure::cache::MemoryCache`] - In-process cache
/// - [`crate::infrastructure::cache::NullCache`] - No-op implementation for disabled caching
#[async_trait]
pub trait CacheService: Send + Sync {
    /// Returns the stored value, or `None` on miss or backend error.
    async fn get(&self, key: &str) -> Option<String>;

    /// Stores `value` under `key` for `ttl_seconds`. Returns whether the write happened.
    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> bool;

    /// Removes `key`. Returns whether a key was removed.
    async fn delete(&self, key: &str) -> bool;

    /// Removes every key matching the glob `pattern` and returns how many were removed.
    async fn delete_by_pattern(&self, pattern: &str) -> u64;

    /// Checks if the cache backend is reachable.
    async fn health_check(&self) -> bool;

    /// Short backend name for logs and health output.
    fn backend_name(&self) -> &'static str;
}

impl dyn CacheService {
    /// Reads and decodes a JSON value.
    ///
    /// An entry that no longer decodes is deleted and treated as a miss.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.get(key).await?;
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                self.delete(key).await;
                None
            }
        }
    }

    /// Encodes `value` as JSON and stores it.
    pub async fn set_json<T: Serialize + Sync + ?Sized>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
    ) -> bool {
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to encode cache entry");
                return false;
            }
        };
        self.set(key, &raw, ttl_seconds).await
    }

    /// Removes every cached entry of `domain`.
    pub async fn invalidate_domain(&self, keys: &CacheKeyBuilder, domain: AnalyticsDomain) -> u64 {
        let deleted = self.delete_by_pattern(&keys.domain_pattern(domain)).await;
        tracing::info!(%domain, deleted, "invalidated domain cache");
        deleted
    }

    /// Removes entries that include any of `entity_ids`, plus the domain-wide aggregates.
    pub async fn invalidate_entities(
        &self,
        keys: &CacheKeyBuilder,
        domain: AnalyticsDomain,
        entity_ids: &[String],
    ) -> u64 {
        let patterns: BTreeSet<String> = entity_ids
            .iter()
            .flat_map(|id| keys.entity_patterns(domain, id))
            .collect();

        let mut deleted = 0;
        for pattern in &patterns {
            deleted += self.delete_by_pattern(pattern).await;
        }
        tracing::info!(%domain, entities = entity_ids.len(), deleted, "invalidated entity cache");
        deleted
    }

    /// Removes every analytics entry under the builder's prefix.
    pub async fn invalidate_all(&self, keys: &CacheKeyBuilder) -> u64 {
        let deleted = self.delete_by_pattern(&keys.all_pattern()).await;
        tracing::info!(deleted, "invalidated all analytics cache entries");
        deleted
    }
}
