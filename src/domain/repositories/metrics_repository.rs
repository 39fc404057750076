//! Repository trait for outreach event counters.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::entities::{AnalyticsDomain, AnalyticsQuery, MetricsRecord};
use crate::error::AppError;

/// Counters for one entity within a query result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityMetrics {
    pub entity_id: String,
    pub metrics: MetricsRecord,
}

/// Repository interface for reading and updating daily counters.
///
/// # Implementations
///
/// - [`crate::infrastructure::persistence::PgMetricsRepository`] - PostgreSQL implementation
/// - Test mocks available with `cfg(test)`
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricsRepository: Send + Sync {
    /// Sums counters over the query's entities (all entities of the domain when
    /// the query lists none) and date range.
    ///
    /// # Errors
    ///
    /// Returns a classified [`AppError`] on database errors.
    async fn totals(&self, query: &AnalyticsQuery) -> Result<MetricsRecord, AppError>;

    /// Returns summed counters per entity, ordered by entity id.
    ///
    /// Entities without counters in the range are included with zero counters.
    async fn per_entity(&self, query: &AnalyticsQuery) -> Result<Vec<EntityMetrics>, AppError>;

    /// Adds `delta` to the entity's counters for `day`.
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_ERROR` if the entity is not registered.
    async fn apply_delta(
        &self,
        domain: AnalyticsDomain,
        entity_id: &str,
        day: NaiveDate,
        delta: MetricsRecord,
    ) -> Result<(), AppError>;

    /// Registers an entity so counters can be recorded for it.
    ///
    /// # Errors
    ///
    /// Returns `CONFLICT` if the entity already exists.
    async fn register_entity(&self, domain: AnalyticsDomain, entity_id: &str)
    -> Result<(), AppError>;

    /// Round-trips to the database.
    async fn ping(&self) -> Result<(), AppError>;
}
