//! In-memory property storage.

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{matches_search, NewProperty, PropertyStore, StoreError, StoreResult};
use crate::types::Property;

/// Vec-backed store kept sorted by id.
#[derive(Debug, Default)]
pub struct MemoryPropertyStore {
    records: RwLock<Vec<Property>>,
    unavailable: AtomicBool,
}

impl MemoryPropertyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records. Duplicate ids keep the last one.
    pub fn from_properties(mut properties: Vec<Property>) -> Self {
        properties.sort_by_key(|p| p.id);
        properties.reverse();
        properties.dedup_by_key(|p| p.id);
        properties.reverse();
        Self {
            records: RwLock::new(properties),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Append a property with the next id.
    pub fn insert(&self, new: NewProperty) -> Property {
        let mut records = self.records.write();
        let id = records.last().map(|p| p.id + 1).unwrap_or(1);
        let now = Utc::now();
        let property = Property {
            id,
            name: new.name,
            city: new.city,
            state: new.state,
            country: new.country,
            latitude: new.latitude,
            longitude: new.longitude,
            geohash5: new.geohash5,
            is_active: new.is_active,
            tags: new.tags,
            created_at: now,
            updated_at: now,
        };
        records.push(property.clone());
        property
    }

    /// Make every subsequent read fail until switched back.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl PropertyStore for MemoryPropertyStore {
    async fn find_range(
        &self,
        search_text: Option<&str>,
        after_id: Option<i64>,
        limit: usize,
    ) -> StoreResult<Vec<Property>> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::unavailable("memory store switched off"));
        }

        let needle = search_text.map(str::to_ascii_lowercase);
        let records = self.records.read();
        Ok(records
            .iter()
            .filter(|p| after_id.map_or(true, |cursor| p.id > cursor))
            .filter(|p| needle.as_deref().map_or(true, |n| matches_search(p, n)))
            .take(limit)
            .cloned()
            .collect())
    }
}
