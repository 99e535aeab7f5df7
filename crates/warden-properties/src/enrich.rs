//! Weather enrichment for property batches.
//!
//! Each located property gets a cache lookup, then a provider fetch on miss.
//! Lookups run concurrently and settle independently: one failed fetch
//! leaves that property without weather and never fails the batch.

use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::instrument;
use warden_weather::{with_retry, CacheStore, Coordinates, RetryConfig, WeatherSnapshot, WeatherSource};

use crate::types::{EnrichedProperty, Property};

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_MAX_CONCURRENCY: usize = 32;

/// Attaches current weather to properties.
pub struct Enricher {
    source: Arc<dyn WeatherSource>,
    cache: Arc<dyn CacheStore<WeatherSnapshot>>,
    ttl: Duration,
    permits: Semaphore,
    retry: RetryConfig,
}

impl Enricher {
    pub fn new(
        source: Arc<dyn WeatherSource>,
        cache: Arc<dyn CacheStore<WeatherSnapshot>>,
    ) -> Self {
        Self {
            source,
            cache,
            ttl: DEFAULT_CACHE_TTL,
            permits: Semaphore::new(DEFAULT_MAX_CONCURRENCY),
            retry: RetryConfig::default(),
        }
    }

    /// How long fetched snapshots stay in the cache.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Cap on provider requests in flight at once.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.permits = Semaphore::new(max.max(1));
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Cache key for a property's weather. Includes the coordinates so a
    /// moved property never reads its old location's snapshot.
    pub fn cache_key(id: i64, coordinates: Coordinates) -> String {
        format!(
            "weather-{}-{}-{}",
            id, coordinates.latitude, coordinates.longitude
        )
    }

    /// Enrich every property, preserving input order and length.
    #[instrument(skip_all, fields(count = properties.len()))]
    pub async fn enrich(&self, properties: Vec<Property>) -> Vec<EnrichedProperty> {
        join_all(properties.into_iter().map(|property| self.enrich_one(property))).await
    }

    async fn enrich_one(&self, property: Property) -> EnrichedProperty {
        let weather = self.weather_for(&property).await;
        EnrichedProperty { property, weather }
    }

    async fn weather_for(&self, property: &Property) -> Option<WeatherSnapshot> {
        let coordinates = property.coordinates()?;
        let key = Self::cache_key(property.id, coordinates);

        if let Some(cached) = self.cache.get(&key) {
            tracing::debug!(property_id = property.id, "Weather cache hit");
            return Some(cached);
        }

        // Each attempt takes its own permit so backoff sleeps hold none.
        let attempt = move || async move {
            // The semaphore is never closed.
            let _permit = self.permits.acquire().await.ok();
            self.source.fetch_weather(coordinates).await
        };

        match with_retry(&self.retry, attempt).await {
            Ok(snapshot) => {
                self.cache.set(&key, snapshot.clone(), self.ttl);
                Some(snapshot)
            }
            Err(e) => {
                tracing::warn!(
                    property_id = property.id,
                    latitude = coordinates.latitude,
                    longitude = coordinates.longitude,
                    "Failed to fetch weather: {}",
                    e
                );
                None
            }
        }
    }
}
