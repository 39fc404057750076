//! API route configuration.
//!
//! Routes are returned without middleware so tests can mount them directly;
//! [`crate::routes::app_router`] adds rate limiting and tracing.

use crate::api::handlers::{
    breakdown_handler, invalidate_handler, overview_handler, rates_handler,
    record_events_handler, register_entity_handler, warm_handler,
};
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post},
};

/// Analytics endpoints, mounted under `/api/analytics`.
///
/// # Endpoints
///
/// - `POST /rates`                                  - Rates for an ad-hoc counters payload
/// - `GET  /{domain}/overview`                      - Aggregated metrics
/// - `GET  /{domain}/breakdown`                     - Per-entity metrics
/// - `POST /{domain}/entities`                      - Register an entity
/// - `POST /{domain}/entities/{entity_id}/events`   - Add a counters delta
pub fn analytics_routes() -> Router<AppState> {
    Router::new()
        .route("/rates", post(rates_handler))
        .route("/{domain}/overview", get(overview_handler))
        .route("/{domain}/breakdown", get(breakdown_handler))
        .route("/{domain}/entities", post(register_entity_handler))
        .route(
            "/{domain}/entities/{entity_id}/events",
            post(record_events_handler),
        )
}

/// Cache management endpoints, mounted under `/api/cache`.
///
/// - `POST /invalidate` - Invalidate by domain / entities, or everything
/// - `POST /warm`       - Run one warming pass
pub fn cache_routes() -> Router<AppState> {
    Router::new()
        .route("/invalidate", post(invalidate_handler))
        .route("/warm", post(warm_handler))
}

/// Every `/api` route.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/analytics", analytics_routes())
        .nest("/cache", cache_routes())
}
