//! Raw request parameters and their validation.

use serde::Deserialize;
use std::collections::BTreeSet;
use thiserror::Error;

use crate::types::{FilterSpec, QueryParams, ValueRange, DEFAULT_LIMIT};

pub const DEFAULT_MAX_LIMIT: usize = 100;

/// A rejected request parameter.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid {field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Page size bounds applied during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_limit: usize,
    pub max_limit: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_LIMIT,
            max_limit: DEFAULT_MAX_LIMIT,
        }
    }
}

/// Query string parameters as received, before any parsing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawQueryParams {
    pub search_text: Option<String>,
    pub limit: Option<String>,
    pub cursor: Option<String>,
    pub temperature_min: Option<String>,
    pub temperature_max: Option<String>,
    pub humidity_min: Option<String>,
    pub humidity_max: Option<String>,
    /// Comma-separated WMO condition codes.
    pub weather_condition: Option<String>,
}

impl RawQueryParams {
    /// Parse and check every parameter, failing on the first bad one.
    pub fn validate(&self, limits: &QueryLimits) -> Result<QueryParams, ValidationError> {
        let search_text = present(&self.search_text).map(str::to_string);

        let limit = match present(&self.limit) {
            None => limits.default_limit,
            Some(raw) => {
                let limit: usize = raw
                    .parse()
                    .map_err(|_| ValidationError::new("limit", format!("{:?} is not a positive integer", raw)))?;
                if limit == 0 || limit > limits.max_limit {
                    return Err(ValidationError::new(
                        "limit",
                        format!("must be between 1 and {}", limits.max_limit),
                    ));
                }
                limit
            }
        };

        let cursor = present(&self.cursor)
            .map(|raw| {
                raw.parse::<i64>()
                    .map_err(|_| ValidationError::new("cursor", format!("{:?} is not an integer", raw)))
            })
            .transpose()?;

        let filters = FilterSpec {
            temperature: parse_range("temperature", &self.temperature_min, &self.temperature_max)?,
            humidity: parse_range("humidity", &self.humidity_min, &self.humidity_max)?,
            condition_codes: parse_codes(&self.weather_condition)?,
        };
        filters.validate()?;

        Ok(QueryParams {
            search_text,
            cursor,
            limit,
            filters: filters.non_empty(),
        })
    }
}

/// Trimmed value, or `None` when missing or blank.
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn parse_bound(field: &str, raw: &str) -> Result<f64, ValidationError> {
    let value: f64 = raw
        .parse()
        .map_err(|_| ValidationError::new(field, format!("{:?} is not a number", raw)))?;
    if !value.is_finite() {
        return Err(ValidationError::new(field, format!("{:?} is not finite", raw)));
    }
    Ok(value)
}

fn parse_range(
    field: &str,
    min: &Option<String>,
    max: &Option<String>,
) -> Result<Option<ValueRange>, ValidationError> {
    let min = present(min).map(|raw| parse_bound(&format!("{}Min", field), raw)).transpose()?;
    let max = present(max).map(|raw| parse_bound(&format!("{}Max", field), raw)).transpose()?;

    Ok(match (min, max) {
        (None, None) => None,
        (min, max) => Some(ValueRange::new(
            min.unwrap_or(f64::NEG_INFINITY),
            max.unwrap_or(f64::INFINITY),
        )),
    })
}

fn parse_codes(raw: &Option<String>) -> Result<Option<BTreeSet<i32>>, ValidationError> {
    let Some(raw) = present(raw) else {
        return Ok(None);
    };

    let codes = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|code| {
            code.parse::<i32>().map_err(|_| {
                ValidationError::new("weatherCondition", format!("{:?} is not an integer code", code))
            })
        })
        .collect::<Result<BTreeSet<_>, _>>()?;

    Ok(if codes.is_empty() { None } else { Some(codes) })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    fn raw() -> RawQueryParams {
        RawQueryParams::default()
    }

    fn some(s: &str) -> Option<String> {
        Some(s.to_string())
    }

    #[test]
    fn test_defaults() {
        let params = raw().validate(&QueryLimits::default()).unwrap();
        assert_eq!(params, QueryParams::default());
        assert_eq!(params.limit, 20);
    }

    #[test]
    fn test_search_text_trimmed_and_blank_dropped() {
        let limits = QueryLimits::default();

        let params = RawQueryParams { search_text: some("  austin "), ..raw() }.validate(&limits).unwrap();
        assert_eq!(params.search_text.as_deref(), Some("austin"));

        let params = RawQueryParams { search_text: some("   "), ..raw() }.validate(&limits).unwrap();
        assert_eq!(params.search_text, None);
    }

    #[test]
    fn test_limit_bounds() {
        let limits = QueryLimits::default();

        for bad in ["0", "101", "-1", "ten", "2.5"] {
            let err = RawQueryParams { limit: some(bad), ..raw() }.validate(&limits).unwrap_err();
            assert_eq!(err.field, "limit", "{} should be rejected", bad);
        }

        let params = RawQueryParams { limit: some("100"), ..raw() }.validate(&limits).unwrap();
        assert_eq!(params.limit, 100);
    }

    #[test]
    fn test_custom_max_limit() {
        let limits = QueryLimits { default_limit: 5, max_limit: 10 };
        assert_eq!(raw().validate(&limits).unwrap().limit, 5);
        assert!(RawQueryParams { limit: some("11"), ..raw() }.validate(&limits).is_err());
    }

    #[test]
    fn test_cursor_must_be_integer() {
        let limits = QueryLimits::default();

        let params = RawQueryParams { cursor: some("42"), ..raw() }.validate(&limits).unwrap();
        assert_eq!(params.cursor, Some(42));

        let err = RawQueryParams { cursor: some("abc"), ..raw() }.validate(&limits).unwrap_err();
        assert_eq!(err.field, "cursor");
    }

    #[test]
    fn test_full_range() {
        let params = RawQueryParams {
            temperature_min: some("10"),
            temperature_max: some("25.5"),
            ..raw()
        }
        .validate(&QueryLimits::default())
        .unwrap();

        let filters = params.filters.unwrap();
        assert_eq!(filters.temperature, Some(ValueRange::new(10.0, 25.5)));
        assert_eq!(filters.humidity, None);
    }

    #[test]
    fn test_lone_bound_is_open_ended() {
        let params = RawQueryParams { humidity_max: some("60"), ..raw() }
            .validate(&QueryLimits::default())
            .unwrap();

        let range = params.filters.unwrap().humidity.unwrap();
        assert_eq!(range.min, f64::NEG_INFINITY);
        assert_eq!(range.max, 60.0);
    }

    #[test]
    fn test_bad_bounds_rejected() {
        let limits = QueryLimits::default();

        let err = RawQueryParams { temperature_min: some("warm"), ..raw() }.validate(&limits).unwrap_err();
        assert_eq!(err.field, "temperatureMin");

        let err = RawQueryParams { humidity_max: some("inf"), ..raw() }.validate(&limits).unwrap_err();
        assert_eq!(err.field, "humidityMax");

        let err = RawQueryParams {
            temperature_min: some("30"),
            temperature_max: some("10"),
            ..raw()
        }
        .validate(&limits)
        .unwrap_err();
        assert_eq!(err.field, "temperature");
    }

    #[test]
    fn test_condition_codes() {
        let limits = QueryLimits::default();

        let params = RawQueryParams { weather_condition: some("61, 63,61,"), ..raw() }
            .validate(&limits)
            .unwrap();
        let codes = params.filters.unwrap().condition_codes.unwrap();
        assert_eq!(codes.into_iter().collect::<Vec<_>>(), vec![61, 63]);

        let params = RawQueryParams { weather_condition: some(" , "), ..raw() }.validate(&limits).unwrap();
        assert_eq!(params.filters, None);

        let err = RawQueryParams { weather_condition: some("1,rain"), ..raw() }
            .validate(&limits)
            .unwrap_err();
        assert_eq!(err.field, "weatherCondition");
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::new("limit", "must be between 1 and 100");
        assert_eq!(err.to_string(), "Invalid limit: must be between 1 and 100");
    }
}
