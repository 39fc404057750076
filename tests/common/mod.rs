#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use outreach_analytics::AppError;
use outreach_analytics::application::services::{AnalyticsService, AnalyticsSettings};
use outreach_analytics::application::warming::{WarmingScheduler, WarmingStrategy};
use outreach_analytics::domain::entities::{AnalyticsDomain, AnalyticsQuery, MetricsRecord};
use outreach_analytics::domain::repositories::{EntityMetrics, MetricsRepository};
use outreach_analytics::infrastructure::cache::{CacheService, MemoryCache};
use outreach_analytics::state::AppState;
use outreach_analytics::utils::retry::RetryConfig;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

type CounterKey = (AnalyticsDomain, String);

/// In-memory stand-in for the Postgres repository.
#[derive(Default)]
pub struct FakeMetricsRepository {
    entities: Mutex<HashMap<CounterKey, Vec<(NaiveDate, MetricsRecord)>>>,
    down: AtomicBool,
    pub reads: AtomicUsize,
}

impl FakeMetricsRepository {
    pub fn set_down(&self, down: bool) {
        self.down.store(down, Ordering::SeqCst);
    }

    pub fn seed(&self, domain: AnalyticsDomain, entity_id: &str, day: NaiveDate, m: MetricsRecord) {
        self.entities
            .lock()
            .unwrap()
            .entry((domain, entity_id.to_string()))
            .or_default()
            .push((day, m));
    }

    fn check_up(&self) -> Result<(), AppError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(AppError::database_connection(
                "Database connection failed",
                json!({ "pg_code": "08006" }),
            ));
        }
        Ok(())
    }

    fn matching(&self, query: &AnalyticsQuery) -> Vec<EntityMetrics> {
        let (from, to) = query.filters.date_range(Utc::now().date_naive());
        let entities = self.entities.lock().unwrap();

        let mut rows: Vec<EntityMetrics> = entities
            .iter()
            .filter(|((domain, id), _)| {
                *domain == query.domain
                    && (query.entity_ids.is_empty() || query.entity_ids.contains(id))
            })
            .map(|((_, id), days)| EntityMetrics {
                entity_id: id.clone(),
                metrics: days
                    .iter()
                    .filter(|(day, _)| from.is_none_or(|f| *day >= f) && to.is_none_or(|t| *day <= t))
                    .map(|(_, m)| *m)
                    .sum(),
            })
            .collect();
        rows.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        rows
    }
}

#[async_trait]
impl MetricsRepository for FakeMetricsRepository {
    async fn totals(&self, query: &AnalyticsQuery) -> Result<MetricsRecord, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        Ok(self.matching(query).into_iter().map(|e| e.metrics).sum())
    }

    async fn per_entity(&self, query: &AnalyticsQuery) -> Result<Vec<EntityMetrics>, AppError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.check_up()?;
        Ok(self.matching(query))
    }

    async fn apply_delta(
        &self,
        domain: AnalyticsDomain,
        entity_id: &str,
        day: NaiveDate,
        delta: MetricsRecord,
    ) -> Result<(), AppError> {
        self.check_up()?;
        let mut entities = self.entities.lock().unwrap();
        let Some(days) = entities.get_mut(&(domain, entity_id.to_string())) else {
            return Err(AppError::bad_request(
                "Referenced record does not exist",
                json!({ "pg_code": "23503" }),
            ));
        };
        days.push((day, delta));
        Ok(())
    }

    async fn register_entity(&self, domain: AnalyticsDomain, entity_id: &str) -> Result<(), AppError> {
        self.check_up()?;
        let mut entities = self.entities.lock().unwrap();
        let key = (domain, entity_id.to_string());
        if entities.contains_key(&key) {
            return Err(AppError::conflict(
                "Record already exists",
                json!({ "pg_code": "23505" }),
            ));
        }
        entities.insert(key, Vec::new());
        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.check_up()
    }
}

pub struct TestContext {
    pub state: AppState,
    pub repository: Arc<FakeMetricsRepository>,
    pub cache: Arc<MemoryCache>,
}

pub fn test_settings() -> AnalyticsSettings {
    AnalyticsSettings {
        retry: RetryConfig {
            max_retries: 1,
            retry_delay_ms: 1,
            exponential_backoff: false,
        },
        ..Default::default()
    }
}

pub fn create_test_context() -> TestContext {
    create_test_context_with(test_settings())
}

pub fn create_test_context_with(settings: AnalyticsSettings) -> TestContext {
    let repository = Arc::new(FakeMetricsRepository::default());
    let cache = Arc::new(MemoryCache::new());

    TestContext {
        state: build_state(repository.clone(), cache.clone(), settings),
        repository,
        cache,
    }
}

/// State over an arbitrary cache backend, for tests that need a failing one.
pub fn create_state_with_cache(
    cache: Arc<dyn CacheService>,
) -> (AppState, Arc<FakeMetricsRepository>) {
    let repository = Arc::new(FakeMetricsRepository::default());
    let state = build_state(repository.clone(), cache, test_settings());
    (state, repository)
}

fn build_state(
    repository: Arc<FakeMetricsRepository>,
    cache: Arc<dyn CacheService>,
    settings: AnalyticsSettings,
) -> AppState {
    let service = Arc::new(AnalyticsService::new(repository, cache, settings));
    let strategy = WarmingStrategy {
        domains: vec![AnalyticsDomain::Campaigns],
        chunk_delay_ms: 0,
        ..Default::default()
    };
    let warming = Arc::new(WarmingScheduler::new(strategy, service.clone()));

    AppState::new(service, warming)
}

pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

pub fn sample_metrics() -> MetricsRecord {
    MetricsRecord {
        sent: 100,
        delivered: 95,
        opened_tracked: 30,
        clicked_tracked: 8,
        replied: 5,
        bounced: 5,
        unsubscribed: 2,
        spam_complaints: 1,
    }
}
