//! Top-level router configuration.
//!
//! # Route Structure
//!
//! - `GET  /health` - Health check: database and cache (not rate limited)
//! - `/api/*`       - Analytics and cache management REST API
//!
//! # Middleware
//!
//! - **Tracing** - Structured request/response logging
//! - **Rate limiting** - Per-IP token bucket on `/api` (proxy-aware when configured)
//! - **Path normalization** - Trailing slash handling

use crate::api;
use crate::api::handlers::health_handler;
use crate::api::middleware::rate_limit::{self, RateLimit};
use crate::api::middleware::tracing;
use crate::state::AppState;
use anyhow::Result;
use axum::Router;
use axum::routing::get;
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};

/// Constructs the application router with all routes and middleware.
///
/// # Arguments
///
/// - `state` - shared application state injected into all handlers
/// - `limit` - per-client token bucket applied to `/api`
/// - `behind_proxy` - when `true`, rate limiting reads client IP from
///   `X-Forwarded-For` / `X-Real-IP` headers instead of the peer socket address
///
/// # Errors
///
/// Returns an error if the rate limit parameters are zero.
pub fn app_router(
    state: AppState,
    limit: RateLimit,
    behind_proxy: bool,
) -> Result<NormalizePath<Router>> {
    let api_router = if behind_proxy {
        api::routes::api_routes().layer(rate_limit::proxy_layer(limit)?)
    } else {
        api::routes::api_routes().layer(rate_limit::layer(limit)?)
    };

    let router = Router::new()
        .route("/health", get(health_handler))
        .nest("/api", api_router)
        .with_state(state)
        .layer(tracing::layer());

    Ok(NormalizePathLayer::trim_trailing_slash().layer(router))
}
