//! In-process cache implementation.

use async_trait::async_trait;
use moka::Expiry;
use moka::future::Cache;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::scan::{drain_scan, glob_match};
use super::service::CacheService;

/// Default capacity bound.
pub const DEFAULT_MAX_ENTRIES: u64 = 10_000;

const DEFAULT_SCAN_COUNT: usize = 100;

#[derive(Clone)]
struct Entry {
    value: Arc<str>,
    ttl: Duration,
}

/// Expires every entry after the TTL it was last written with.
struct WrittenTtl;

impl Expiry<String, Entry> for WrittenTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Cache backed by a [`moka::future::Cache`] with per-entry TTLs and a
/// capacity bound.
///
/// Expired entries are dropped by moka's housekeeping, and entries are evicted
/// once the bound is reached. Pattern deletion walks
/// the keyspace in pages through the same cursor loop the Redis backend uses.
/// Suitable for development, single-instance deployments and tests.
pub struct MemoryCache {
    entries: Cache<String, Entry>,
    scan_count: usize,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_MAX_ENTRIES, DEFAULT_SCAN_COUNT)
    }

    pub fn with_limits(max_entries: u64, scan_count: usize) -> Self {
        debug!(max_entries, "Using MemoryCache");
        Self {
            entries: Cache::builder()
                .max_capacity(max_entries.max(1))
                .expire_after(WrittenTtl)
                .build(),
            scan_count: scan_count.max(1),
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.iter().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One page of a scan: cursor is an offset into the sorted live keyspace.
    fn scan_page(&self, cursor: u64, pattern: &str) -> (u64, Vec<String>) {
        let mut keys: Vec<Arc<String>> = self.entries.iter().map(|(key, _)| key).collect();
        keys.sort_unstable();

        let start = (cursor as usize).min(keys.len());
        let end = (start + self.scan_count).min(keys.len());
        let next = if end >= keys.len() { 0 } else { end as u64 };

        let page = keys[start..end]
            .iter()
            .filter(|k| glob_match(pattern, k.as_str()))
            .map(|k| k.as_str().to_owned())
            .collect();

        (next, page)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheService for MemoryCache {
    async fn get(&self, key: &str) -> Option<String> {
        match self.entries.get(key).await {
            Some(entry) => {
                debug!("Cache HIT: {}", key);
                Some(entry.value.to_string())
            }
            None => {
                debug!("Cache MISS: {}", key);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: u64) -> bool {
        let entry = Entry {
            value: Arc::from(value),
            ttl: Duration::from_secs(ttl_seconds.max(1)),
        };
        self.entries.insert(key.to_string(), entry).await;
        debug!("Cache SET: {} (TTL: {}s)", key, ttl_seconds);
        true
    }

    async fn delete(&self, key: &str) -> bool {
        self.entries.remove(key).await.is_some()
    }

    async fn delete_by_pattern(&self, pattern: &str) -> u64 {
        let keys = match drain_scan(|cursor| {
            let page = self.scan_page(cursor, pattern);
            async move { Ok::<_, Infallible>(page) }
        })
        .await
        {
            Ok(keys) => keys,
            Err(never) => match never {},
        };

        let mut deleted = 0;
        for key in &keys {
            if self.entries.remove(key.as_str()).await.is_some() {
                deleted += 1;
            }
        }
        debug!("Cache DELETE pattern {}: {} keys", pattern, deleted);
        deleted
    }

    async fn health_check(&self) -> bool {
        true
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
