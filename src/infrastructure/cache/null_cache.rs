//! No-op cache implementation for disabled or unreachable caching.

use super::service::CacheService;
use async_trait::async_trait;
use tracing::debug;

/// A cache implementation that does nothing.
///
/// Used when caching is explicitly disabled, or in place of a backend that
/// could not be reached at startup. Every read misses, every write is dropped
/// and pattern deletes remove nothing.
///
/// A stand-in created with [`NullCache::unavailable`] reports the original
/// backend's name and fails its health check, so the outage stays visible.
///
/// # Use Cases
///
/// - Development environments without Redis
/// - Testing scenarios where caching should be bypassed
/// - Fallback when Redis connection fails at startup
#[derive(Debug, Default)]
pub struct NullCache {
    stands_in_for: Option<&'static str>,
}

impl NullCache {
    /// Creates a NullCache for deliberately disabled caching.
    pub fn new() -> Self {
        debug!("Using NullCache (caching disabled)");
        Self::default()
    }

    /// Creates a NullCache standing in for `backend`, which could not be reached.
    pub fn unavailable(backend: &'static str) -> Self {
        debug!(backend, "Using NullCache in place of unreachable backend");
        Self {
            stands_in_for: Some(backend),
        }
    }
}

#[async_trait]
impl CacheService for NullCache {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }

    async fn set(&self, _key: &str, _value: &str, _ttl_seconds: u64) -> bool {
        false
    }

    async fn delete(&self, _key: &str) -> bool {
        false
    }

    async fn delete_by_pattern(&self, _pattern: &str) -> u64 {
        0
    }

    async fn health_check(&self) -> bool {
        self.stands_in_for.is_none()
    }

    fn backend_name(&self) -> &'static str {
        self.stands_in_for.unwrap_or("none")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_null_cache_never_stores() {
        let cache = NullCache::new();

        assert!(!cache.set("k", "v", 60).await);
        assert_eq!(cache.get("k").await, None);
        assert!(!cache.delete("k").await);
        assert_eq!(cache.delete_by_pattern("*").await, 0);
        assert!(cache.health_check().await);
        assert_eq!(cache.backend_name(), "none");
    }

    #[tokio::test]
    async fn test_unavailable_stand_in_reports_unhealthy() {
        let cache = NullCache::unavailable("redis");

        assert!(!cache.health_check().await);
        assert_eq!(cache.backend_name(), "redis");
        assert_eq!(cache.get("k").await, None);
        assert!(!cache.set("k", "v", 60).await);
    }
}
