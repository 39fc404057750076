//! Read-through cached analytics service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;

use crate::application::warming::{WarmingExecutor, WarmingTask};
use crate::domain::entities::{
    AnalyticsDomain, AnalyticsFilters, AnalyticsOperation, AnalyticsQuery, MetricsRecord,
    validate_entity_id,
};
use crate::domain::rates::{FormattedRates, RateSet, calculate_all_rates};
use crate::domain::repositories::MetricsRepository;
use crate::error::AppError;
use crate::infrastructure::cache::{CacheKeyBuilder, CacheService};
use crate::utils::retry::{RetryConfig, with_retry};

/// Where a result was served from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Database,
    Cache,
    /// Zeroed placeholder returned while the database is unreachable.
    Fallback,
}

/// Aggregated metrics and rates for a set of entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
    pub domain: AnalyticsDomain,
    pub entity_ids: Vec<String>,
    pub filters: AnalyticsFilters,
    pub metrics: MetricsRecord,
    pub rates: RateSet,
    pub formatted_rates: FormattedRates,
    pub funnel_warnings: Vec<String>,
    pub source: DataSource,
    pub generated_at: DateTime<Utc>,
}

/// Metrics and rates of a single entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityAnalytics {
    pub entity_id: String,
    pub metrics: MetricsRecord,
    pub rates: RateSet,
    pub formatted_rates: FormattedRates,
    pub funnel_warnings: Vec<String>,
}

/// Per-entity analytics plus their combined totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsBreakdown {
    pub domain: AnalyticsDomain,
    pub filters: AnalyticsFilters,
    pub entities: Vec<EntityAnalytics>,
    pub totals: MetricsRecord,
    pub total_rates: RateSet,
    pub source: DataSource,
    pub generated_at: DateTime<Utc>,
}

impl AnalyticsOverview {
    fn from_metrics(query: &AnalyticsQuery, metrics: MetricsRecord, source: DataSource) -> Self {
        let rates = calculate_all_rates(&metrics);
        Self {
            domain: query.domain,
            entity_ids: query.entity_ids.clone(),
            filters: query.filters.clone(),
            metrics,
            formatted_rates: rates.formatted(),
            rates,
            funnel_warnings: metrics.funnel_warnings(),
            source,
            generated_at: Utc::now(),
        }
    }
}

impl EntityAnalytics {
    fn new(entity_id: String, metrics: MetricsRecord) -> Self {
        let rates = calculate_all_rates(&metrics);
        Self {
            entity_id,
            metrics,
            formatted_rates: rates.formatted(),
            rates,
            funnel_warnings: metrics.funnel_warnings(),
        }
    }
}

impl AnalyticsBreakdown {
    fn from_entities(
        query: &AnalyticsQuery,
        entities: Vec<EntityAnalytics>,
        source: DataSource,
    ) -> Self {
        let totals: MetricsRecord = entities.iter().map(|e| e.metrics).sum();
        Self {
            domain: query.domain,
            filters: query.filters.clone(),
            entities,
            totals,
            total_rates: calculate_all_rates(&totals),
            source,
            generated_at: Utc::now(),
        }
    }
}

trait Sourced {
    fn mark_source(&mut self, source: DataSource);
}

impl Sourced for AnalyticsOverview {
    fn mark_source(&mut self, source: DataSource) {
        self.source = source;
    }
}

impl Sourced for AnalyticsBreakdown {
    fn mark_source(&mut self, source: DataSource) {
        self.source = source;
    }
}

/// Tunables for [`AnalyticsService`].
#[derive(Debug, Clone)]
pub struct AnalyticsSettings {
    pub keys: CacheKeyBuilder,
    pub ttl_seconds: u64,
    pub retry: RetryConfig,
    pub fallback_enabled: bool,
}

impl Default for AnalyticsSettings {
    fn default() -> Self {
        Self {
            keys: CacheKeyBuilder::new("analytics", 300),
            ttl_seconds: 300,
            retry: RetryConfig::default(),
            fallback_enabled: true,
        }
    }
}

/// Serves analytics from the cache when possible and from the repository otherwise.
///
/// Reads go through [`with_retry`]; writes are attempted once because a
/// connection failure leaves the outcome of an increment unknown.
pub struct AnalyticsService {
    repository: Arc<dyn MetricsRepository>,
    cache: Arc<dyn CacheService>,
    settings: AnalyticsSettings,
}

impl AnalyticsService {
    pub fn new(
        repository: Arc<dyn MetricsRepository>,
        cache: Arc<dyn CacheService>,
        settings: AnalyticsSettings,
    ) -> Self {
        Self {
            repository,
            cache,
            settings,
        }
    }

    pub fn keys(&self) -> &CacheKeyBuilder {
        &self.settings.keys
    }

    pub fn cache(&self) -> &Arc<dyn CacheService> {
        &self.cache
    }

    /// Returns aggregated metrics for the query.
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_ERROR` for a malformed query, or the classified
    /// database error when no fallback applies.
    pub async fn overview(&self, query: AnalyticsQuery) -> Result<AnalyticsOverview, AppError> {
        query.validate()?;
        let key = self.key_for(&query, AnalyticsOperation::Overview);

        self.read_through(
            &key,
            &query,
            AnalyticsOperation::Overview,
            self.load_overview(&query),
            || AnalyticsOverview::from_metrics(&query, MetricsRecord::default(), DataSource::Fallback),
        )
        .await
    }

    /// Returns per-entity metrics for the query, ordered by entity ID.
    ///
    /// # Errors
    ///
    /// Same as [`AnalyticsService::overview`].
    pub async fn breakdown(&self, query: AnalyticsQuery) -> Result<AnalyticsBreakdown, AppError> {
        query.validate()?;
        let key = self.key_for(&query, AnalyticsOperation::Breakdown);

        self.read_through(
            &key,
            &query,
            AnalyticsOperation::Breakdown,
            self.load_breakdown(&query),
            || AnalyticsBreakdown::from_entities(&query, Vec::new(), DataSource::Fallback),
        )
        .await
    }

    /// Recomputes one cache entry from the database, ignoring what is cached.
    pub async fn refresh(
        &self,
        operation: AnalyticsOperation,
        query: AnalyticsQuery,
    ) -> Result<(), AppError> {
        query.validate()?;
        let key = self.key_for(&query, operation);
        let ttl = self.settings.ttl_seconds;

        let stored = match operation {
            AnalyticsOperation::Overview => {
                let overview = self.load_overview(&query).await?;
                self.cache.set_json(&key, &overview, ttl).await
            }
            AnalyticsOperation::Breakdown => {
                let breakdown = self.load_breakdown(&query).await?;
                self.cache.set_json(&key, &breakdown, ttl).await
            }
        };
        tracing::debug!(key, stored, "refreshed cache entry");
        Ok(())
    }

    /// Adds `delta` to today's counters of an entity and drops its cached results.
    ///
    /// Returns the number of cache entries removed.
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_ERROR` for a bad entity ID or an all-zero delta, and
    /// `400` when the entity is not registered.
    pub async fn record_events(
        &self,
        domain: AnalyticsDomain,
        entity_id: &str,
        delta: MetricsRecord,
    ) -> Result<u64, AppError> {
        validate_entity_id(entity_id)?;
        if delta.is_empty() {
            return Err(AppError::bad_request(
                "At least one counter must be non-zero",
                json!({ "entity_id": entity_id }),
            ));
        }

        self.repository
            .apply_delta(domain, entity_id, Utc::now().date_naive(), delta)
            .await?;

        Ok(self
            .cache
            .invalidate_entities(&self.settings.keys, domain, &[entity_id.to_string()])
            .await)
    }

    /// Registers a new entity so that it shows up in breakdowns.
    ///
    /// # Errors
    ///
    /// Returns `CONFLICT` when the entity already exists.
    pub async fn register_entity(
        &self,
        domain: AnalyticsDomain,
        entity_id: &str,
    ) -> Result<(), AppError> {
        validate_entity_id(entity_id)?;
        self.repository.register_entity(domain, entity_id).await?;
        self.cache
            .invalidate_entities(&self.settings.keys, domain, &[entity_id.to_string()])
            .await;
        tracing::info!(%domain, entity_id, "registered entity");
        Ok(())
    }

    /// Invalidates cached results.
    ///
    /// With no domain everything under the prefix is removed; with a domain and
    /// no entity IDs the whole domain is removed.
    pub async fn invalidate(
        &self,
        domain: Option<AnalyticsDomain>,
        entity_ids: &[String],
    ) -> Result<u64, AppError> {
        for id in entity_ids {
            validate_entity_id(id)?;
        }

        let keys = &self.settings.keys;
        let deleted = match domain {
            None if entity_ids.is_empty() => self.cache.invalidate_all(keys).await,
            None => {
                return Err(AppError::bad_request(
                    "entity_ids require a domain",
                    json!({ "entity_ids": entity_ids }),
                ));
            }
            Some(domain) if entity_ids.is_empty() => {
                self.cache.invalidate_domain(keys, domain).await
            }
            Some(domain) => self.cache.invalidate_entities(keys, domain, entity_ids).await,
        };
        Ok(deleted)
    }

    /// Checks database reachability.
    pub async fn check_database(&self) -> Result<(), AppError> {
        self.repository.ping().await
    }

    fn key_for(&self, query: &AnalyticsQuery, operation: AnalyticsOperation) -> String {
        self.settings.keys.key(
            query.domain,
            operation,
            &query.entity_ids,
            &query.filters,
            Utc::now(),
        )
    }

    async fn load_overview(&self, query: &AnalyticsQuery) -> Result<AnalyticsOverview, AppError> {
        let metrics = with_retry(&self.settings.retry, "metrics.totals", || {
            self.repository.totals(query)
        })
        .await?;
        Ok(AnalyticsOverview::from_metrics(
            query,
            metrics,
            DataSource::Database,
        ))
    }

    async fn load_breakdown(&self, query: &AnalyticsQuery) -> Result<AnalyticsBreakdown, AppError> {
        let rows = with_retry(&self.settings.retry, "metrics.per_entity", || {
            self.repository.per_entity(query)
        })
        .await?;
        let entities = rows
            .into_iter()
            .map(|row| EntityAnalytics::new(row.entity_id, row.metrics))
            .collect();
        Ok(AnalyticsBreakdown::from_entities(
            query,
            entities,
            DataSource::Database,
        ))
    }

    async fn read_through<T, Fut>(
        &self,
        key: &str,
        query: &AnalyticsQuery,
        operation: AnalyticsOperation,
        load: Fut,
        fallback: impl FnOnce() -> T,
    ) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned + Sourced + Sync,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let domain = query.domain.as_str();
        let op = operation.as_str();

        if let Some(mut cached) = self.cache.get_json::<T>(key).await {
            metrics::counter!("analytics_cache_hits_total", "domain" => domain, "operation" => op)
                .increment(1);
            tracing::debug!(key, "cache hit");
            cached.mark_source(DataSource::Cache);
            return Ok(cached);
        }
        metrics::counter!("analytics_cache_misses_total", "domain" => domain, "operation" => op)
            .increment(1);

        match load.await {
            Ok(fresh) => {
                self.cache
                    .set_json(key, &fresh, self.settings.ttl_seconds)
                    .await;
                Ok(fresh)
            }
            Err(err) if self.settings.fallback_enabled && err.is_unavailable() => {
                tracing::warn!(
                    domain,
                    operation = op,
                    code = %err.code,
                    "database unavailable, serving fallback analytics"
                );
                Ok(fallback())
            }
            Err(err) => Err(err),
        }
    }
}

#[async_trait]
impl WarmingExecutor for AnalyticsService {
    async fn warm(&self, task: &WarmingTask) -> Result<(), AppError> {
        let query = AnalyticsQuery::new(task.domain).with_filters(task.filters.clone());
        self.refresh(task.operation, query).await
    }
}
