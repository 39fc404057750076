//! Application layer orchestrating repositories and the cache.
//!
//! # Modules
//!
//! - [`services::analytics_service::AnalyticsService`] - Read-through cached analytics
//! - [`warming`] - Periodic cache warming in bounded-concurrency chunks

pub mod services;
pub mod warming;
