use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use warden_weather::{Coordinates, WeatherSnapshot};

use crate::params::ValidationError;

/// Default page size when the caller does not ask for one.
pub const DEFAULT_LIMIT: usize = 20;

/// A geolocated property as stored. Ids are assigned by storage and only grow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub id: i64,
    pub name: String,
    pub city: String,
    pub state: String,
    pub country: String,
    #[serde(rename = "lat")]
    pub latitude: Option<f64>,
    #[serde(rename = "lng")]
    pub longitude: Option<f64>,
    pub geohash5: Option<String>,
    pub is_active: bool,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Property {
    /// Both coordinates, or `None` when either is missing.
    pub fn coordinates(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.latitude?, self.longitude?))
    }
}

/// A property paired with the weather observed at its location, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedProperty {
    #[serde(flatten)]
    pub property: Property,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSnapshot>,
}

impl EnrichedProperty {
    pub fn id(&self) -> i64 {
        self.property.id
    }
}

/// Inclusive numeric bounds. Either side may be infinite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn validate(&self, field: &str) -> Result<(), ValidationError> {
        if self.min.is_nan() || self.max.is_nan() {
            return Err(ValidationError::new(field, "bounds must be numbers"));
        }
        if self.min > self.max {
            return Err(ValidationError::new(
                field,
                format!("min {} is greater than max {}", self.min, self.max),
            ));
        }
        Ok(())
    }
}

/// Weather predicates. Every present clause must hold (AND).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub temperature: Option<ValueRange>,
    pub humidity: Option<ValueRange>,
    pub condition_codes: Option<BTreeSet<i32>>,
}

impl FilterSpec {
    /// True when no clause is set.
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.humidity.is_none() && self.condition_codes.is_none()
    }

    /// `None` for a spec with no clauses, so it means "no filtering".
    pub fn non_empty(self) -> Option<Self> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(range) = &self.temperature {
            range.validate("temperature")?;
        }
        if let Some(range) = &self.humidity {
            range.validate("humidity")?;
        }
        Ok(())
    }
}

/// One page request.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    pub search_text: Option<String>,
    /// Return only properties with an id greater than this.
    pub cursor: Option<i64>,
    pub limit: usize,
    pub filters: Option<FilterSpec>,
}

impl Default for QueryParams {
    fn default() -> Self {
        Self {
            search_text: None,
            cursor: None,
            limit: DEFAULT_LIMIT,
            filters: None,
        }
    }
}

/// One page of results in ascending id order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub properties: Vec<EnrichedProperty>,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_cursor: Option<i64>,
}
