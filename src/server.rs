//! HTTP server initialization and runtime setup.
//!
//! Handles record store selection, cache setup, resilience wiring and the
//! Axum server lifecycle.

use crate::api::middleware::rate_limit::RateLimitSettings;
use crate::application::services::DrugService;
use crate::config::{Config, StoreBackend};
use crate::domain::repositories::{DrugRepository, StoreError};
use crate::domain::search::SearchEngine;
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::persistence::{FileDrugRepository, PgDrugRepository};
use crate::infrastructure::resilience::{CircuitBreaker, RetryOptions};
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

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - Record store (PostgreSQL with migrations, or the JSON file tree)
/// - Redis cache (or NullCache fallback)
/// - Circuit breaker and retry policy around the store
/// - Axum HTTP server with graceful shutdown
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let drug_service = Arc::new(build_drug_service(&config).await?);
    let cache = connect_cache(&config).await;

    let state = AppState::new(drug_service, cache);

    let limits = RateLimitSettings {
        per_second: config.rate_limit_per_second,
        burst: config.rate_limit_burst,
    };
    let app = app_router(state, limits, config.behind_proxy);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Selects the record store and wraps it in the resilience policies.
///
/// Shared by the HTTP server and the admin tool.
pub async fn build_drug_service(config: &Config) -> Result<DrugService<dyn DrugRepository>> {
    let repository: Arc<dyn DrugRepository>;
    let retry: RetryOptions<StoreError>;
    let circuit_key = match config.store_backend {
        StoreBackend::Postgres => {
            let pool = connect_database(config).await?;
            repository = Arc::new(PgDrugRepository::new(Arc::new(pool)));
            retry = config.retry_options().on_database_errors();
            "store:postgres"
        }
        StoreBackend::Files => {
            tracing::info!("Serving records from {}", config.data_dir.display());
            repository = Arc::new(FileDrugRepository::new(config.data_dir.clone()));
            retry = config.retry_options().on_network_errors();
            "store:files"
        }
    };

    let breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker_options()));

    Ok(DrugService::new(repository, breaker, circuit_key, retry)
        .with_engine(SearchEngine::new(config.search_weights))
        .with_default_mode(config.default_search_mode))
}

async fn connect_database(config: &Config) -> Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL is required for the postgres store")?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;

    Ok(pool)
}

async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache disabled (NullCache)");
        return Arc::new(NullCache::new());
    };

    match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
        Ok(redis) => {
            tracing::info!("Cache enabled (Redis)");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
            Arc::new(NullCache::new())
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
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
