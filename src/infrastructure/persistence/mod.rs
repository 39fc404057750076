//! PostgreSQL repository implementations.
//!
//! Concrete implementations of domain repository traits using SQLx.
//!
//! # Repositories
//!
//! - [`PgMetricsRepository`] - Daily counters storage and aggregation

pub mod pg_metrics_repository;

pub use pg_metrics_repository::PgMetricsRepository;
