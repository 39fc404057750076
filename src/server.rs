//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache selection, cache warming and the Axum
//! server lifecycle including graceful shutdown.

use crate::api::middleware::rate_limit::RateLimit;
use crate::application::services::AnalyticsService;
use crate::application::warming::{WarmingScheduler, WarmingStrategy};
use crate::config::{CacheBackend, Config};
use crate::infrastructure::cache::{CacheService, MemoryCache, NullCache, RedisCache};
use crate::infrastructure::persistence::PgMetricsRepository;
use crate::routes::app_router;
use crate::state::AppState;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// Opens the PostgreSQL pool using the configured pool limits.
pub async fn connect_database(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    tracing::info!("Connected to database");
    Ok(pool)
}

/// Builds the configured cache backend.
///
/// An unreachable Redis degrades to [`NullCache::unavailable`] instead of
/// failing startup; health checks then report the cache as failing.
pub async fn build_cache(config: &Config) -> Arc<dyn CacheService> {
    match (config.cache_backend, &config.redis_url) {
        (CacheBackend::Redis, Some(redis_url)) => {
            match RedisCache::connect(redis_url, config.cache_scan_count).await {
                Ok(redis) => {
                    tracing::info!("Cache enabled (Redis)");
                    Arc::new(redis)
                }
                Err(e) => {
                    tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
                    Arc::new(NullCache::unavailable("redis"))
                }
            }
        }
        (CacheBackend::Memory, _) => {
            tracing::info!("Cache enabled (in-memory)");
            Arc::new(MemoryCache::with_limits(
                config.cache_memory_max_entries,
                config.cache_scan_count,
            ))
        }
        _ => {
            tracing::info!("Cache disabled (NullCache)");
            Arc::new(NullCache::new())
        }
    }
}

/// Loads the warming strategy from `CACHE_WARMING_STRATEGY`, or the default one.
pub fn load_warming_strategy(config: &Config) -> Result<WarmingStrategy> {
    match &config.cache_warming_strategy {
        Some(path) => WarmingStrategy::from_file(path),
        None => Ok(WarmingStrategy::default()),
    }
}

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Cache backend (Redis, in-memory or NullCache)
/// - Cache warming scheduler (when enabled)
/// - Axum HTTP server, stopped by Ctrl-C or SIGTERM
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - The warming strategy file is invalid
/// - Server bind fails
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;

    let cache = build_cache(&config).await;

    let repository = Arc::new(PgMetricsRepository::new(Arc::new(pool.clone())));
    let analytics_service = Arc::new(AnalyticsService::new(
        repository,
        cache,
        config.analytics_settings(),
    ));

    let strategy = load_warming_strategy(&config)?;
    let warming = Arc::new(WarmingScheduler::new(strategy, analytics_service.clone()));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let warming_task = if config.cache_warming_enabled {
        let warming = Arc::clone(&warming);
        let handle = tokio::spawn(async move { warming.run(shutdown_rx).await });
        tracing::info!("Cache warming started");
        Some(handle)
    } else {
        tracing::info!("Cache warming disabled");
        None
    };

    let state = AppState::new(analytics_service, warming);

    let limit = RateLimit {
        per_second: config.rate_limit_per_second,
        burst_size: config.rate_limit_burst,
    };
    let app = app_router(state, limit, config.behind_proxy)?;

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("HTTP server stopped");

    let _ = shutdown_tx.send(true);
    if let Some(handle) = warming_task
        && let Err(e) = handle.await
    {
        tracing::error!("Cache warming task failed: {}", e);
    }

    pool.close().await;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
