//! Weather predicates over enriched properties.

use crate::types::{EnrichedProperty, FilterSpec};

/// Keep the properties satisfying every clause of `filters`, in order.
///
/// With no filters everything passes, including properties without
/// weather. With filters, a property lacking weather never passes.
pub fn apply_weather_filters(
    properties: Vec<EnrichedProperty>,
    filters: Option<&FilterSpec>,
) -> Vec<EnrichedProperty> {
    match filters {
        None => properties,
        Some(spec) => properties.into_iter().filter(|p| matches(p, spec)).collect(),
    }
}

/// Whether one property satisfies `spec`.
pub fn matches(property: &EnrichedProperty, spec: &FilterSpec) -> bool {
    let Some(weather) = &property.weather else {
        return false;
    };

    if let Some(range) = &spec.temperature {
        if !range.contains(weather.temperature) {
            return false;
        }
    }

    if let Some(range) = &spec.humidity {
        if !range.contains(weather.humidity) {
            return false;
        }
    }

    if let Some(codes) = &spec.condition_codes {
        if !codes.contains(&weather.condition_code) {
            return false;
        }
    }

    true
}
