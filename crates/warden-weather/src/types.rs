use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::retry::{is_retryable_status, RetryDecision};

/// A point on the globe to fetch weather for
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Current conditions at one coordinate, normalized from the provider response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSnapshot {
    pub temperature: f64,
    pub wind_speed: f64,
    pub humidity: f64,
    #[serde(rename = "weatherCode")]
    pub condition_code: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_at: Option<NaiveDateTime>,
}

/// Weather provider errors
#[derive(Debug, thiserror::Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Weather API error: {status} - {message}")]
    Api { status: u16, message: String },
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),
}

impl WeatherError {
    /// Whether a caller-side retry has a chance of succeeding.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => reqwest::StatusCode::from_u16(*status)
                .map(|s| is_retryable_status(s) == RetryDecision::Retry)
                .unwrap_or(false),
            Self::Parse(_) | Self::InvalidBaseUrl(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn test_snapshot_serializes_with_api_field_names() {
        let snapshot = WeatherSnapshot {
            temperature: 21.5,
            wind_speed: 3.2,
            humidity: 40.0,
            condition_code: 3,
            observed_at: None,
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["temperature"], 21.5);
        assert_eq!(json["windSpeed"], 3.2);
        assert_eq!(json["humidity"], 40.0);
        assert_eq!(json["weatherCode"], 3);
        assert!(json.get("observedAt").is_none());
    }

    #[test]
    fn test_api_error_retryability() {
        let server = WeatherError::Api {
            status: 503,
            message: "busy".into(),
        };
        let client = WeatherError::Api {
            status: 400,
            message: "bad latitude".into(),
        };
        assert!(server.is_retryable());
        assert!(!client.is_retryable());
        assert!(!WeatherError::Parse("missing current".into()).is_retryable());
    }
}
