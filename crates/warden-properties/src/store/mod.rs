//! Property storage trait and error types.
//!
//! `PropertyStore` abstracts the ordered, cursor-based range read the query
//! loop depends on. `SqlitePropertyStore` is the production backend and
//! `MemoryPropertyStore` backs tests and ephemeral setups.

mod memory;
mod sqlite;

pub use memory::MemoryPropertyStore;
pub use sqlite::SqlitePropertyStore;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::types::Property;

/// Errors that can occur during property storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Blocking storage task failed to complete.
    #[error("Storage task failed: {0}")]
    Task(String),

    /// Seed file could not be read or decoded.
    #[error("Import error: {0}")]
    Import(String),

    /// Backend is not reachable.
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// A batch did not advance past the requested cursor.
    #[error("Storage returned id {returned} at or before cursor {cursor}")]
    OutOfOrder { cursor: i64, returned: i64 },
}

impl StoreError {
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Task(e.to_string())
    }
}

/// Result type for property storage operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Ordered range reads over properties.
#[async_trait]
pub trait PropertyStore: Send + Sync {
    /// Up to `limit` properties with id greater than `after_id`, matching
    /// `search_text` as a case-insensitive substring of name, city or state.
    /// Case folding is ASCII-only, matching SQLite's `LIKE`.
    ///
    /// Results are in strictly ascending id order. `None` for `after_id`
    /// starts from the beginning, `None` for `search_text` matches all.
    async fn find_range(
        &self,
        search_text: Option<&str>,
        after_id: Option<i64>,
        limit: usize,
    ) -> StoreResult<Vec<Property>>;
}

/// Fields supplied when inserting a property. Ids and timestamps are
/// assigned by the store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProperty {
    pub name: String,
    pub city: String,
    pub state: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default, rename = "lat")]
    pub latitude: Option<f64>,
    #[serde(default, rename = "lng")]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub geohash5: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_country() -> String {
    "US".to_string()
}

fn default_active() -> bool {
    true
}

impl NewProperty {
    pub fn new(name: impl Into<String>, city: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            city: city.into(),
            state: state.into(),
            country: default_country(),
            latitude: None,
            longitude: None,
            geohash5: None,
            is_active: true,
            tags: Vec::new(),
        }
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

/// Case-insensitive substring match used by the in-memory store.
pub(crate) fn matches_search(property: &Property, needle_lower: &str) -> bool {
    [&property.name, &property.city, &property.state]
        .iter()
        .any(|field| field.to_ascii_lowercase().contains(needle_lower))
}
