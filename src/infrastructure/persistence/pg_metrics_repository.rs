//! PostgreSQL implementation of the metrics repository.

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;

use crate::domain::entities::{AnalyticsDomain, AnalyticsQuery, MetricsRecord};
use crate::domain::repositories::{EntityMetrics, MetricsRepository};
use crate::error::AppError;

/// PostgreSQL repository over daily counters.
///
/// Counters are stored per `(domain, entity_id, day)` and summed at query time.
/// Sums are cast back to `BIGINT` because Postgres widens `SUM(bigint)` to `NUMERIC`.
pub struct PgMetricsRepository {
    pool: Arc<PgPool>,
}

impl PgMetricsRepository {
    /// Creates a new repository with a database connection pool.
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CounterRow {
    sent: i64,
    delivered: i64,
    opened_tracked: i64,
    clicked_tracked: i64,
    replied: i64,
    bounced: i64,
    unsubscribed: i64,
    spam_complaints: i64,
}

impl From<CounterRow> for MetricsRecord {
    fn from(row: CounterRow) -> Self {
        let c = |v: i64| v.max(0) as u64;
        MetricsRecord {
            sent: c(row.sent),
            delivered: c(row.delivered),
            opened_tracked: c(row.opened_tracked),
            clicked_tracked: c(row.clicked_tracked),
            replied: c(row.replied),
            bounced: c(row.bounced),
            unsubscribed: c(row.unsubscribed),
            spam_complaints: c(row.spam_complaints),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct EntityCounterRow {
    entity_id: String,
    #[sqlx(flatten)]
    counters: CounterRow,
}

fn to_db(field: &'static str, value: u64) -> Result<i64, AppError> {
    i64::try_from(value).map_err(|_| {
        AppError::bad_request(
            "Counter value out of range",
            json!({ "field": field, "value": value }),
        )
    })
}

#[async_trait]
impl MetricsRepository for PgMetricsRepository {
    async fn totals(&self, query: &AnalyticsQuery) -> Result<MetricsRecord, AppError> {
        let (from, to) = query.filters.date_range(Utc::now().date_naive());

        let row = sqlx::query_as::<_, CounterRow>(
            r#"
            SELECT
                COALESCE(SUM(sent), 0)::BIGINT            AS sent,
                COALESCE(SUM(delivered), 0)::BIGINT       AS delivered,
                COALESCE(SUM(opened_tracked), 0)::BIGINT  AS opened_tracked,
                COALESCE(SUM(clicked_tracked), 0)::BIGINT AS clicked_tracked,
                COALESCE(SUM(replied), 0)::BIGINT         AS replied,
                COALESCE(SUM(bounced), 0)::BIGINT         AS bounced,
                COALESCE(SUM(unsubscribed), 0)::BIGINT    AS unsubscribed,
                COALESCE(SUM(spam_complaints), 0)::BIGINT AS spam_complaints
            FROM analytics_daily_counters
            WHERE domain = $1
              AND (cardinality($2::text[]) = 0 OR entity_id = ANY($2))
              AND ($3::date IS NULL OR day >= $3)
              AND ($4::date IS NULL OR day <= $4)
            "#,
        )
        .bind(query.domain.as_str())
        .bind(&query.entity_ids)
        .bind(from)
        .bind(to)
        .fetch_one(self.pool.as_ref())
        .await?;

        Ok(row.into())
    }

    async fn per_entity(&self, query: &AnalyticsQuery) -> Result<Vec<EntityMetrics>, AppError> {
        let (from, to) = query.filters.date_range(Utc::now().date_naive());

        let rows = sqlx::query_as::<_, EntityCounterRow>(
            r#"
            SELECT
                e.entity_id,
                COALESCE(SUM(c.sent), 0)::BIGINT            AS sent,
                COALESCE(SUM(c.delivered), 0)::BIGINT       AS delivered,
                COALESCE(SUM(c.opened_tracked), 0)::BIGINT  AS opened_tracked,
                COALESCE(SUM(c.clicked_tracked), 0)::BIGINT AS clicked_tracked,
                COALESCE(SUM(c.replied), 0)::BIGINT         AS replied,
                COALESCE(SUM(c.bounced), 0)::BIGINT         AS bounced,
                COALESCE(SUM(c.unsubscribed), 0)::BIGINT    AS unsubscribed,
                COALESCE(SUM(c.spam_complaints), 0)::BIGINT AS spam_complaints
            FROM analytics_entities e
            LEFT JOIN analytics_daily_counters c
                ON c.domain = e.domain
               AND c.entity_id = e.entity_id
               AND ($3::date IS NULL OR c.day >= $3)
               AND ($4::date IS NULL OR c.day <= $4)
            WHERE e.domain = $1
              AND (cardinality($2::text[]) = 0 OR e.entity_id = ANY($2))
            GROUP BY e.entity_id
            ORDER BY e.entity_id
            "#,
        )
        .bind(query.domain.as_str())
        .bind(&query.entity_ids)
        .bind(from)
        .bind(to)
        .fetch_all(self.pool.as_ref())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| EntityMetrics {
                entity_id: r.entity_id,
                metrics: r.counters.into(),
            })
            .collect())
    }

    async fn apply_delta(
        &self,
        domain: AnalyticsDomain,
        entity_id: &str,
        day: NaiveDate,
        delta: MetricsRecord,
    ) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO analytics_daily_counters (
                domain, entity_id, day,
                sent, delivered, opened_tracked, clicked_tracked,
                replied, bounced, unsubscribed, spam_complaints
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            ON CONFLICT (domain, entity_id, day) DO UPDATE SET
                sent            = analytics_daily_counters.sent + EXCLUDED.sent,
                delivered       = analytics_daily_counters.delivered + EXCLUDED.delivered,
                opened_tracked  = analytics_daily_counters.opened_tracked + EXCLUDED.opened_tracked,
                clicked_tracked = analytics_daily_counters.clicked_tracked + EXCLUDED.clicked_tracked,
                replied         = analytics_daily_counters.replied + EXCLUDED.replied,
                bounced         = analytics_daily_counters.bounced + EXCLUDED.bounced,
                unsubscribed    = analytics_daily_counters.unsubscribed + EXCLUDED.unsubscribed,
                spam_complaints = analytics_daily_counters.spam_complaints + EXCLUDED.spam_complaints
            "#,
        )
        .bind(domain.as_str())
        .bind(entity_id)
        .bind(day)
        .bind(to_db("sent", delta.sent)?)
        .bind(to_db("delivered", delta.delivered)?)
        .bind(to_db("opened_tracked", delta.opened_tracked)?)
        .bind(to_db("clicked_tracked", delta.clicked_tracked)?)
        .bind(to_db("replied", delta.replied)?)
        .bind(to_db("bounced", delta.bounced)?)
        .bind(to_db("unsubscribed", delta.unsubscribed)?)
        .bind(to_db("spamComplaints", delta.spam_complaints)?)
        .execute(self.pool.as_ref())
        .await?;

        Ok(())
    }

    async fn register_entity(
        &self,
        domain: AnalyticsDomain,
        entity_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query("INSERT INTO analytics_entities (domain, entity_id) VALUES ($1, $2)")
            .bind(domain.as_str())
            .bind(entity_id)
            .execute(self.pool.as_ref())
            .await?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(self.pool.as_ref()).await?;
        Ok(())
    }
}
