//! Business logic services for the application layer.

pub mod analytics_service;

pub use analytics_service::{
    AnalyticsBreakdown, AnalyticsOverview, AnalyticsService, AnalyticsSettings, DataSource,
    EntityAnalytics,
};
