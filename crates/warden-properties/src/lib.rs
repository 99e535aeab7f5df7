//! Property search with live weather enrichment.
//!
//! Properties are pulled from storage in ascending-id batches, enriched with
//! current weather (cache first), filtered on weather attributes, and
//! accumulated until a page is full or storage runs dry.

pub mod enrich;
pub mod filter;
pub mod params;
pub mod query;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use enrich::Enricher;
pub use filter::apply_weather_filters;
pub use params::{QueryLimits, RawQueryParams, ValidationError};
pub use query::{PropertyQuery, QueryError};
pub use store::{MemoryPropertyStore, NewProperty, PropertyStore, SqlitePropertyStore, StoreError};
pub use types::{EnrichedProperty, FilterSpec, Property, QueryParams, QueryResult, ValueRange};
