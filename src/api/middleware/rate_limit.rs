//! Per-client rate limiting using the token bucket algorithm.

use anyhow::{Context, Result};
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use std::sync::Arc;
use tower_governor::{
    GovernorLayer,
    governor::GovernorConfigBuilder,
    key_extractor::{PeerIpKeyExtractor, SmartIpKeyExtractor},
};

/// Token bucket parameters.
#[derive(Debug, Clone, Copy)]
pub struct RateLimit {
    /// Tokens replenished per second.
    pub per_second: u64,
    pub burst_size: u32,
}

impl RateLimit {
    /// Governor counts in replenish intervals, not rates.
    fn replenish_interval_ms(&self) -> u64 {
        (1000 / self.per_second.max(1)).max(1)
    }
}

/// Rate limiter keyed by the socket peer address.
///
/// Requests exceeding the limit receive `429 Too Many Requests`. Requires the
/// router to be served with `into_make_service_with_connect_info::<SocketAddr>()`.
pub fn layer(
    limit: RateLimit,
) -> Result<GovernorLayer<PeerIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>> {
    let governor_conf = GovernorConfigBuilder::default()
        .per_millisecond(limit.replenish_interval_ms())
        .burst_size(limit.burst_size)
        .finish()
        .context("rate limit requires non-zero per_second and burst_size")?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}

/// Rate limiter keyed by `X-Forwarded-For` / `X-Real-IP`, falling back to the peer address.
///
/// Only for deployments behind a trusted reverse proxy: the headers are client-controlled otherwise.
pub fn proxy_layer(
    limit: RateLimit,
) -> Result<GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>> {
    let governor_conf = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_millisecond(limit.replenish_interval_ms())
        .burst_size(limit.burst_size)
        .finish()
        .context("rate limit requires non-zero per_second and burst_size")?;

    Ok(GovernorLayer::new(Arc::new(governor_conf)))
}
