//! Repository trait definitions for the domain layer.
//!
//! Traits define the data access contract; implementations live in
//! `crate::infrastructure::persistence`. Mock implementations are generated via
//! `mockall` for unit tests.

pub mod metrics_repository;

pub use metrics_repository::{EntityMetrics, MetricsRepository};

#[cfg(test)]
pub use metrics_repository::MockMetricsRepository;
