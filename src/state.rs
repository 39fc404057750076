//! Shared application state injected into handlers.

use std::sync::Arc;

use crate::application::services::AnalyticsService;
use crate::application::warming::WarmingScheduler;
use crate::infrastructure::cache::CacheService;

#[derive(Clone)]
pub struct AppState {
    pub analytics_service: Arc<AnalyticsService>,
    pub cache: Arc<dyn CacheService>,
    pub warming: Arc<WarmingScheduler>,
}

impl AppState {
    pub fn new(analytics_service: Arc<AnalyticsService>, warming: Arc<WarmingScheduler>) -> Self {
        let cache = Arc::clone(analytics_service.cache());
        Self {
            analytics_service,
            cache,
            warming,
        }
    }
}
