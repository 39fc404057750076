//! Redis-backed cache implementation.

use super::scan::drain_scan;
use super::service::{CacheError, CacheResult, CacheService};
use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};
use tracing::{debug, error, info, warn};

/// Keys are deleted in batches of this size after a pattern scan.
const DELETE_BATCH_SIZE: usize = 500;

/// Redis cache implementation.
///
/// Uses connection pooling via `ConnectionManager` for efficient connection reuse.
/// All operations are fail-open: errors are logged but don't propagate to callers.
pub struct RedisCache {
    client: ConnectionManager,
    scan_count: usize,
}

impl RedisCache {
    /// Connects to Redis and validates the connection with a PING.
    ///
    /// # Arguments
    ///
    /// - `redis_url` - Redis connection string (e.g., `"redis://localhost:6379"`)
    /// - `scan_count` - `COUNT` hint passed to each `SCAN` during pattern deletes
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::ConnectionError`] if the URL is invalid, the connection cannot
    /// be established, or the PING health check fails.
    pub async fn connect(redis_url: &str, scan_count: usize) -> CacheResult<Self> {
        info!("Connecting to Redis");

        let client = Client::open(redis_url).map_err(|e| {
            CacheError::ConnectionError(format!("Failed to create Redis client: {}", e))
        })?;

        let manager = ConnectionManager::new(client).await.map_err(|e| {
            CacheError::ConnectionError(format!("Failed to connect to Redis: {}", e))
        })?;

        let mut test_conn = manager.clone();
        test_conn
            .ping::<()>()
            .await
            .map_err(|e| CacheError::ConnectionError(format!("Redis PING failed: {}", e)))?;

        info!("Connected to Redis");

        Ok(Self {
            client: manager,
            scan_count: scan_count.max(1),
        })
    }

    fn record_error() {
        metrics::counter!("analytics_cache_errors_total", "backend" => "redis").increment(1);
    }
}

#[async_trait]
impl CacheService for RedisCache {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.client.clone();

        match conn.get::<_, Option<String>>(key).await {
            Ok(Some(value)) => {
                debug!("Cache HIT: {}", key);
                Some(value)
            }
            Ok(None) => {
                debug!("Cache MISS: {}", key);
                None
            }
            Err(e) => {
                error!("Redis GET error for {}: {}", key, e);
                Self::record_error();
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> bool {
        let mut conn = self.client.clone();
        let ttl_seconds = ttl_seconds.max(1);

        match conn.set_ex::<_, _, ()>(key, value, ttl_seconds).await {
            Ok(_) => {
                debug!("Cache SET: {} (TTL: {}s)", key, ttl_seconds);
                true
            }
            Err(e) => {
                warn!("Redis SET error for {}: {}", key, e);
                Self::record_error();
                false
            }
        }
    }

    async fn delete(&self, key: &str) -> bool {
        let mut conn = self.client.clone();

        match conn.del::<_, i64>(key).await {
            Ok(deleted) => {
                if deleted > 0 {
                    debug!("Cache DELETE: {}", key);
                }
                deleted > 0
            }
            Err(e) => {
                warn!("Redis DEL error for {}: {}", key, e);
                Self::record_error();
                false
            }
        }
    }

    async fn delete_by_pattern(&self, pattern: &str) -> u64 {
        let scan_conn = self.client.clone();
        let count = self.scan_count;

        let keys = drain_scan(|cursor| {
            let mut conn = scan_conn.clone();
            let pattern = pattern.to_string();
            async move {
                redis::cmd("SCAN")
                    .arg(cursor)
                    .arg("MATCH")
                    .arg(pattern)
                    .arg("COUNT")
                    .arg(count)
                    .query_async::<(u64, Vec<String>)>(&mut conn)
                    .await
            }
        })
        .await;

        let keys = match keys {
            Ok(keys) => keys,
            Err(e) => {
                warn!("Redis SCAN error for pattern {}: {}", pattern, e);
                Self::record_error();
                return 0;
            }
        };

        let mut conn = self.client.clone();
        let mut deleted = 0u64;
        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            match conn.del::<_, u64>(batch.to_vec()).await {
                Ok(n) => deleted += n,
                Err(e) => {
                    warn!("Redis DEL error for pattern {}: {}", pattern, e);
                    Self::record_error();
                }
            }
        }

        debug!("Cache DELETE pattern {}: {} keys", pattern, deleted);
        deleted
    }

    async fn health_check(&self) -> bool {
        let mut conn = self.client.clone();
        conn.ping::<()>().await.is_ok()
    }

    fn backend_name(&self) -> &'static str {
        "redis"
    }
}
