//! Deterministic, time-bucketed cache keys.
//!
//! Key layout: `{prefix}:{domain}:{operation}:{ids}:{filters}:{bucket}`
//!
//! - `ids` - sorted, de-duplicated entity IDs joined with `,`, or `~all`; entity
//!   IDs never contain `~`, so the sentinel cannot collide with a real ID
//! - `filters` - URL-safe base64 of the compact filter JSON, or `nofilter`
//! - `bucket` - unix time floor-divided by the time window
//!
//! Because the bucket is part of the key, keys rotate every window and stale
//! entries simply stop being read; TTLs clean them up.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};

use crate::domain::entities::{AnalyticsDomain, AnalyticsFilters, AnalyticsOperation};

pub const ALL_ENTITIES: &str = "~all";
pub const NO_FILTER: &str = "nofilter";

/// Builds a cache key for an analytics query at time `now`.
pub fn generate_cache_key(
    prefix: &str,
    domain: AnalyticsDomain,
    operation: AnalyticsOperation,
    entity_ids: &[String],
    filters: &AnalyticsFilters,
    time_window_seconds: u64,
    now: DateTime<Utc>,
) -> String {
    let bucket = now.timestamp().max(0) as u64 / time_window_seconds.max(1);

    format!(
        "{}:{}:{}:{}:{}:{}",
        prefix,
        domain,
        operation,
        entity_segment(entity_ids),
        filter_segment(filters),
        bucket
    )
}

fn entity_segment(entity_ids: &[String]) -> String {
    if entity_ids.is_empty() {
        return ALL_ENTITIES.to_string();
    }
    let mut ids: Vec<&str> = entity_ids.iter().map(String::as_str).collect();
    ids.sort_unstable();
    ids.dedup();
    ids.join(",")
}

fn filter_segment(filters: &AnalyticsFilters) -> String {
    if filters.is_empty() {
        return NO_FILTER.to_string();
    }
    match serde_json::to_vec(filters) {
        Ok(json) => URL_SAFE_NO_PAD.encode(json),
        Err(_) => NO_FILTER.to_string(),
    }
}

/// Cache key and invalidation-pattern factory bound to one prefix and window.
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    prefix: String,
    time_window_seconds: u64,
}

impl CacheKeyBuilder {
    pub fn new(prefix: impl Into<String>, time_window_seconds: u64) -> Self {
        Self {
            prefix: prefix.into(),
            time_window_seconds,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn time_window_seconds(&self) -> u64 {
        self.time_window_seconds
    }

    pub fn key(
        &self,
        domain: AnalyticsDomain,
        operation: AnalyticsOperation,
        entity_ids: &[String],
        filters: &AnalyticsFilters,
        now: DateTime<Utc>,
    ) -> String {
        generate_cache_key(
            &self.prefix,
            domain,
            operation,
            entity_ids,
            filters,
            self.time_window_seconds,
            now,
        )
    }

    pub fn domain_pattern(&self, domain: AnalyticsDomain) -> String {
        format!("{}:{}:*", self.prefix, domain)
    }

    /// Patterns matching keys whose entity segment contains `entity_id` as a
    /// whole token, plus the domain's `~all` aggregates.
    pub fn entity_patterns(&self, domain: AnalyticsDomain, entity_id: &str) -> Vec<String> {
        let base = format!("{}:{}:*", self.prefix, domain);
        vec![
            format!("{base}:{entity_id}:*"),
            format!("{base}:{entity_id},*"),
            format!("{base},{entity_id}:*"),
            format!("{base},{entity_id},*"),
            format!("{base}:{ALL_ENTITIES}:*"),
        ]
    }

    pub fn all_pattern(&self) -> String {
        format!("{}:*", self.prefix)
    }
}
