//! Warden server binary.
//!
//! Loads configuration, opens property storage, wires the weather client and
//! cache into the query engine, and serves the HTTP API until Ctrl-C.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use warden_api::{create_router, AppState};
use warden_core::{Config, StorageConfig};
use warden_properties::{Enricher, PropertyQuery, QueryLimits, SqlitePropertyStore};
use warden_weather::{spawn_sweeper, RetryConfig, SharedCache, WeatherClient, WeatherSnapshot};

#[tokio::main]
async fn main() -> Result<()> {
    warden_core::init();

    let (config, _) = Config::load_validated().context("Failed to load configuration")?;

    let store = open_store(&config.storage)?;

    let client = WeatherClient::with_options(
        &config.weather.base_url,
        Duration::from_secs(config.weather.timeout_secs),
    )?;

    let cache: Arc<SharedCache<WeatherSnapshot>> = Arc::new(SharedCache::new());
    let sweeper = spawn_sweeper::<WeatherSnapshot>(
        cache.clone(),
        Duration::from_secs(config.weather.sweep_interval_secs),
    );

    let enricher = Enricher::new(Arc::new(client), cache)
        .with_ttl(Duration::from_secs(config.weather.cache_ttl_secs))
        .with_max_concurrency(config.weather.max_concurrency)
        .with_retry(RetryConfig::with_max_retries(config.weather.max_retries));

    let query = PropertyQuery::new(Arc::new(store), Arc::new(enricher))
        .with_batch_size(config.query.batch_size);

    let limits = QueryLimits {
        default_limit: config.query.default_limit,
        max_limit: config.query.max_limit,
    };
    let app = create_router(AppState::new(query, limits), &config.server.allowed_origins);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(%addr, "Warden listening");

    tokio::select! {
        result = axum::serve(listener, app) => {
            result.context("Server error")?;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    sweeper.abort();
    Ok(())
}

/// Open the SQLite store, importing the seed file into an empty database.
fn open_store(storage: &StorageConfig) -> Result<SqlitePropertyStore> {
    let store = SqlitePropertyStore::new(&storage.database_path).with_context(|| {
        format!("Failed to open database {}", storage.database_path.display())
    })?;

    if let Some(seed) = &storage.seed_file {
        if store.count()? == 0 {
            store
                .import_json(seed)
                .with_context(|| format!("Failed to import {}", seed.display()))?;
        } else {
            tracing::debug!("Database already populated; skipping seed import");
        }
    }

    tracing::info!(
        path = %storage.database_path.display(),
        properties = store.count()?,
        "Property store ready"
    );
    Ok(store)
}
