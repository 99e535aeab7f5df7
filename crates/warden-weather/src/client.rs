//! Open-Meteo current-conditions client.

use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;
use url::Url;

use crate::types::{Coordinates, WeatherError, WeatherSnapshot};

const OPEN_METEO_BASE_URL: &str = "https://api.open-meteo.com/v1";
const CURRENT_FIELDS: &str = "temperature_2m,wind_speed_10m,relative_humidity_2m,weathercode";
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Anything that can produce current conditions for a coordinate.
///
/// One call per coordinate, no retries; retry policy belongs to the caller.
#[async_trait]
pub trait WeatherSource: Send + Sync {
    async fn fetch_weather(&self, coordinates: Coordinates)
        -> Result<WeatherSnapshot, WeatherError>;
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: CurrentBlock,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    time: String,
    temperature_2m: f64,
    wind_speed_10m: f64,
    relative_humidity_2m: f64,
    #[serde(alias = "weather_code")]
    weathercode: i32,
}

impl CurrentBlock {
    fn into_snapshot(self) -> Result<WeatherSnapshot, WeatherError> {
        let observed_at = parse_observed_at(&self.time)?;
        Ok(WeatherSnapshot {
            temperature: self.temperature_2m,
            wind_speed: self.wind_speed_10m,
            humidity: self.relative_humidity_2m,
            condition_code: self.weathercode,
            observed_at: Some(observed_at),
        })
    }
}

/// Open-Meteo reports local ISO-8601 times without seconds ("2024-06-01T12:15").
fn parse_observed_at(time: &str) -> Result<NaiveDateTime, WeatherError> {
    NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(time, "%Y-%m-%dT%H:%M:%S"))
        .map_err(|e| WeatherError::Parse(format!("invalid time {:?}: {}", time, e)))
}

#[derive(Debug, Clone)]
pub struct WeatherClient {
    client: Arc<Client>,
    base_url: Url,
}

impl WeatherClient {
    pub fn new() -> Result<Self, WeatherError> {
        Self::with_options(
            OPEN_METEO_BASE_URL,
            Duration::from_secs(REQUEST_TIMEOUT_SECS),
        )
    }

    pub fn with_options(base_url: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| WeatherError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;

        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
        })
    }

    fn forecast_url(&self, coordinates: Coordinates) -> Result<Url, WeatherError> {
        let endpoint = format!("{}/forecast", self.base_url.as_str().trim_end_matches('/'));
        Url::parse_with_params(
            &endpoint,
            &[
                ("latitude", coordinates.latitude.to_string()),
                ("longitude", coordinates.longitude.to_string()),
                ("current", CURRENT_FIELDS.to_string()),
            ],
        )
        .map_err(|e| WeatherError::InvalidBaseUrl(e.to_string()))
    }

    /// Fetch current conditions for one coordinate.
    #[instrument(skip(self), level = "debug")]
    pub async fn current_weather(
        &self,
        coordinates: Coordinates,
    ) -> Result<WeatherSnapshot, WeatherError> {
        let url = self.forecast_url(coordinates)?;
        let response = self.client.get(url).send().await?;
        let body: ForecastResponse = self.handle_response(response).await?;
        body.current.into_snapshot()
    }

    /// Map non-success statuses and undecodable bodies to `WeatherError`.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T, WeatherError> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(WeatherError::Api {
                status: status.as_u16(),
                message: text,
            });
        }

        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| WeatherError::Parse(format!("JSON parse error: {}", e)))
    }
}

#[async_trait]
impl WeatherSource for WeatherClient {
    async fn fetch_weather(
        &self,
        coordinates: Coordinates,
    ) -> Result<WeatherSnapshot, WeatherError> {
        self.current_weather(coordinates).await
    }
}
