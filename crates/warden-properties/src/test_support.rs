//! Shared fixtures for unit tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use warden_weather::{Coordinates, WeatherError, WeatherSnapshot, WeatherSource};

use crate::store::{PropertyStore, StoreResult};
use crate::types::Property;

/// A located property with a predictable name.
pub fn property(id: i64) -> Property {
    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    Property {
        id,
        name: format!("Property {}", id),
        city: "Austin".into(),
        state: "TX".into(),
        country: "US".into(),
        latitude: Some(30.0 + id as f64 / 1000.0),
        longitude: Some(-97.0),
        geohash5: None,
        is_active: true,
        tags: vec![],
        created_at: created,
        updated_at: created,
    }
}

/// A property with no coordinates.
pub fn unlocated(id: i64) -> Property {
    Property {
        latitude: None,
        longitude: None,
        ..property(id)
    }
}

pub fn snapshot(temperature: f64, humidity: f64, code: i32) -> WeatherSnapshot {
    WeatherSnapshot {
        temperature,
        wind_speed: 5.0,
        humidity,
        condition_code: code,
        observed_at: None,
    }
}

/// Weather source answering from a per-latitude table, counting calls.
///
/// Latitudes not in the table get `fallback`, or an error when unset.
#[derive(Default)]
pub struct StubWeather {
    by_latitude: Mutex<HashMap<u64, WeatherSnapshot>>,
    fallback: Mutex<Option<WeatherSnapshot>>,
    calls: AtomicUsize,
}

impl StubWeather {
    pub fn always(snapshot: WeatherSnapshot) -> Self {
        let stub = Self::default();
        *stub.fallback.lock() = Some(snapshot);
        stub
    }

    pub fn failing() -> Self {
        Self::default()
    }

    /// Answer `snapshot` for the coordinates of `property`.
    pub fn answer_for(&self, property: &Property, snapshot: WeatherSnapshot) {
        let lat = property.latitude.expect("property has coordinates");
        self.by_latitude.lock().insert(lat.to_bits(), snapshot);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WeatherSource for StubWeather {
    async fn fetch_weather(&self, coordinates: Coordinates) -> Result<WeatherSnapshot, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let hit = self.by_latitude.lock().get(&coordinates.latitude.to_bits()).cloned();
        hit.or_else(|| self.fallback.lock().clone()).ok_or(WeatherError::Api {
            status: 503,
            message: "stub outage".into(),
        })
    }
}

/// Store wrapper recording every cursor it is asked for.
pub struct RecordingStore<S> {
    inner: S,
    cursors: Mutex<Vec<Option<i64>>>,
}

impl<S> RecordingStore<S> {
    pub fn new(inner: S) -> Arc<Self> {
        Arc::new(Self {
            inner,
            cursors: Mutex::new(Vec::new()),
        })
    }

    pub fn cursors(&self) -> Vec<Option<i64>> {
        self.cursors.lock().clone()
    }
}

#[async_trait]
impl<S: PropertyStore> PropertyStore for RecordingStore<S> {
    async fn find_range(
        &self,
        search_text: Option<&str>,
        after_id: Option<i64>,
        limit: usize,
    ) -> StoreResult<Vec<Property>> {
        self.cursors.lock().push(after_id);
        self.inner.find_range(search_text, after_id, limit).await
    }
}
