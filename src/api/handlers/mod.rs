//! HTTP request handlers for API endpoints.
//!
//! Each handler module corresponds to a logical grouping of endpoints.

pub mod analytics;
pub mod cache;
pub mod health;
pub mod rates;

pub use analytics::{breakdown_handler, overview_handler, record_events_handler, register_entity_handler};
pub use cache::{invalidate_handler, warm_handler};
pub use health::health_handler;
pub use rates::rates_handler;
