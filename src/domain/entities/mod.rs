//! Core domain entities representing the analytics data model.
//!
//! # Entity Types
//!
//! - [`MetricsRecord`] - Raw event counters for an entity or an aggregate
//! - [`AnalyticsQuery`] - Which domain, entities and time window to measure
//! - [`AnalyticsDomain`] / [`AnalyticsOperation`] - Closed sets that also form cache key segments

pub mod metrics;
pub mod query;

pub use metrics::MetricsRecord;
pub use query::{
    AnalyticsDomain, AnalyticsFilters, AnalyticsOperation, AnalyticsQuery, validate_entity_id,
};
