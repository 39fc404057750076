//! Background cache warming.
//!
//! A [`WarmingStrategy`] expands into one [`WarmingTask`] per
//! `(domain, operation, filter preset)`. The [`WarmingScheduler`] runs tasks in
//! chunks: every task of a chunk runs concurrently, chunks run one after
//! another with a fixed pause in between. A failed task is counted and logged
//! and never aborts the run.

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::domain::entities::{AnalyticsDomain, AnalyticsFilters, AnalyticsOperation};
use crate::error::AppError;

/// One cache entry to precompute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WarmingTask {
    pub domain: AnalyticsDomain,
    pub operation: AnalyticsOperation,
    pub filters: AnalyticsFilters,
}

/// Computes and stores the cache entry for a task.
#[async_trait]
pub trait WarmingExecutor: Send + Sync {
    async fn warm(&self, task: &WarmingTask) -> Result<(), AppError>;
}

/// What to warm and how fast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarmingStrategy {
    pub domains: Vec<AnalyticsDomain>,
    pub operations: Vec<AnalyticsOperation>,
    pub filter_presets: Vec<AnalyticsFilters>,
    pub interval_seconds: u64,
    pub chunk_size: usize,
    pub chunk_delay_ms: u64,
}

impl Default for WarmingStrategy {
    fn default() -> Self {
        Self {
            domains: vec![
                AnalyticsDomain::Campaigns,
                AnalyticsDomain::Mailboxes,
                AnalyticsDomain::Domains,
            ],
            operations: vec![AnalyticsOperation::Overview, AnalyticsOperation::Breakdown],
            filter_presets: vec![
                AnalyticsFilters::last_days(7),
                AnalyticsFilters::last_days(30),
                AnalyticsFilters::last_days(90),
            ],
            interval_seconds: 900,
            chunk_size: 5,
            chunk_delay_ms: 250,
        }
    }
}

impl WarmingStrategy {
    /// Loads a strategy from a JSON file. Missing fields take their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read warming strategy {}", path.display()))?;
        let strategy: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid warming strategy {}", path.display()))?;
        strategy
            .validate()
            .with_context(|| format!("Invalid warming strategy {}", path.display()))?;
        Ok(strategy)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.chunk_size == 0 {
            anyhow::bail!("chunk_size must be greater than 0");
        }
        if self.interval_seconds == 0 {
            anyhow::bail!("interval_seconds must be greater than 0");
        }
        for preset in &self.filter_presets {
            preset.validate().context("invalid filter preset")?;
        }
        Ok(())
    }

    /// Expands the strategy into tasks, domain-major.
    pub fn tasks(&self) -> Vec<WarmingTask> {
        let mut tasks = Vec::new();
        for &domain in &self.domains {
            for &operation in &self.operations {
                for filters in &self.filter_presets {
                    tasks.push(WarmingTask {
                        domain,
                        operation,
                        filters: filters.clone(),
                    });
                }
            }
        }
        tasks
    }
}

/// Outcome of one warming run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WarmingReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
}

pub struct WarmingScheduler {
    strategy: WarmingStrategy,
    executor: Arc<dyn WarmingExecutor>,
}

impl WarmingScheduler {
    pub fn new(strategy: WarmingStrategy, executor: Arc<dyn WarmingExecutor>) -> Self {
        Self { strategy, executor }
    }

    pub fn strategy(&self) -> &WarmingStrategy {
        &self.strategy
    }

    /// Runs every task of the strategy once.
    pub async fn run_once(&self) -> WarmingReport {
        let started = Instant::now();
        let tasks = self.strategy.tasks();
        let chunk_delay = Duration::from_millis(self.strategy.chunk_delay_ms);

        let mut report = WarmingReport {
            total: tasks.len(),
            ..Default::default()
        };

        let chunks: Vec<&[WarmingTask]> = tasks.chunks(self.strategy.chunk_size.max(1)).collect();
        let last = chunks.len().saturating_sub(1);

        for (index, chunk) in chunks.into_iter().enumerate() {
            let mut set = JoinSet::new();
            for task in chunk.iter().cloned() {
                let executor = Arc::clone(&self.executor);
                set.spawn(async move {
                    let result = executor.warm(&task).await;
                    (task, result)
                });
            }

            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok((_, Ok(()))) => {
                        report.succeeded += 1;
                        metrics::counter!("cache_warming_tasks_total", "outcome" => "success")
                            .increment(1);
                    }
                    Ok((task, Err(err))) => {
                        report.failed += 1;
                        metrics::counter!("cache_warming_tasks_total", "outcome" => "failure")
                            .increment(1);
                        tracing::warn!(
                            domain = %task.domain,
                            operation = %task.operation,
                            code = %err.code,
                            error = %err.message,
                            "cache warming task failed"
                        );
                    }
                    Err(join_err) => {
                        report.failed += 1;
                        metrics::counter!("cache_warming_tasks_total", "outcome" => "failure")
                            .increment(1);
                        tracing::error!(error = %join_err, "cache warming task panicked");
                    }
                }
            }

            if index < last && !chunk_delay.is_zero() {
                tokio::time::sleep(chunk_delay).await;
            }
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        metrics::counter!("cache_warming_runs_total").increment(1);
        tracing::info!(
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            duration_ms = report.duration_ms,
            "cache warming run finished"
        );
        report
    }

    /// Runs immediately and then every `interval_seconds` until `shutdown` flips to `true`.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker =
            tokio::time::interval(Duration::from_secs(self.strategy.interval_seconds.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_seconds = self.strategy.interval_seconds,
            tasks = self.strategy.tasks().len(),
            "cache warming scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.run_once().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("cache warming scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingExecutor {
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        seen: Mutex<Vec<WarmingTask>>,
        fail_domain: Option<AnalyticsDomain>,
    }

    #[async_trait]
    impl WarmingExecutor for RecordingExecutor {
        async fn warm(&self, task: &WarmingTask) -> Result<(), AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(5)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(task.clone());

            if Some(task.domain) == self.fail_domain {
                return Err(AppError::database_connection("down", json!({})));
            }
            Ok(())
        }
    }

    fn strategy(chunk_size: usize) -> WarmingStrategy {
        WarmingStrategy {
            domains: vec![AnalyticsDomain::Campaigns, AnalyticsDomain::Leads],
            operations: vec![AnalyticsOperation::Overview],
            filter_presets: vec![
                AnalyticsFilters::last_days(7),
                AnalyticsFilters::last_days(30),
                AnalyticsFilters::last_days(90),
            ],
            interval_seconds: 60,
            chunk_size,
            chunk_delay_ms: 1,
        }
    }

    #[test]
    fn test_default_strategy_expands_to_cross_product() {
        let strategy = WarmingStrategy::default();
        assert_eq!(strategy.tasks().len(), 3 * 2 * 3);
        assert!(strategy.validate().is_ok());
    }

    #[test]
    fn test_strategy_partial_json_uses_defaults() {
        let strategy: WarmingStrategy =
            serde_json::from_value(json!({ "domains": ["leads"], "chunk_size": 2 })).unwrap();

        assert_eq!(strategy.domains, vec![AnalyticsDomain::Leads]);
        assert_eq!(strategy.chunk_size, 2);
        assert_eq!(strategy.interval_seconds, 900);
        assert_eq!(strategy.tasks().len(), 2 * 3);
    }

    #[test]
    fn test_zero_chunk_size_is_invalid() {
        let strategy = WarmingStrategy {
            chunk_size: 0,
            ..Default::default()
        };
        assert!(strategy.validate().is_err());
    }

    #[test]
    fn test_from_file_reports_path_on_error() {
        let missing = std::env::temp_dir().join("outreach-analytics-missing-strategy.json");
        let err = WarmingStrategy::from_file(&missing).unwrap_err();
        assert!(format!("{err:#}").contains("missing-strategy.json"));

        let invalid = std::env::temp_dir().join("outreach-analytics-invalid-strategy.json");
        std::fs::write(&invalid, r#"{ "chunk_size": 0 }"#).unwrap();
        let err = WarmingStrategy::from_file(&invalid).unwrap_err();
        std::fs::remove_file(&invalid).ok();

        let message = format!("{err:#}");
        assert!(message.contains("invalid-strategy.json"));
        assert!(message.contains("chunk_size"));
    }

    #[tokio::test]
    async fn test_run_once_counts_outcomes() {
        let executor = Arc::new(RecordingExecutor {
            fail_domain: Some(AnalyticsDomain::Leads),
            ..Default::default()
        });
        let scheduler = WarmingScheduler::new(strategy(2), executor.clone());

        let report = scheduler.run_once().await;

        assert_eq!(report.total, 6);
        assert_eq!(report.succeeded, 3);
        assert_eq!(report.failed, 3);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_run_once_caps_concurrency_at_chunk_size() {
        let executor = Arc::new(RecordingExecutor::default());
        let scheduler = WarmingScheduler::new(strategy(2), executor.clone());

        scheduler.run_once().await;

        assert!(executor.max_in_flight.load(Ordering::SeqCst) <= 2);
        assert_eq!(executor.seen.lock().unwrap().len(), 6);
    }

    #[tokio::test]
    async fn test_run_once_with_empty_strategy() {
        let executor = Arc::new(RecordingExecutor::default());
        let scheduler = WarmingScheduler::new(
            WarmingStrategy {
                domains: Vec::new(),
                ..Default::default()
            },
            executor.clone(),
        );

        let report = scheduler.run_once().await;

        assert_eq!(report.total, 0);
        assert_eq!(executor.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let executor = Arc::new(RecordingExecutor::default());
        let scheduler = Arc::new(WarmingScheduler::new(strategy(6), executor.clone()));
        let (tx, rx) = watch::channel(false);

        let handle = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.run(rx).await })
        };

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(executor.calls.load(Ordering::SeqCst), 6);
    }
}
