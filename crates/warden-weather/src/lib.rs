//! Weather enrichment for Warden
//!
//! Fetches current conditions from the Open-Meteo API and keeps them in a
//! time-bounded in-memory cache shared across requests.

pub mod cache;
pub mod client;
pub mod retry;
pub mod types;

pub use cache::{spawn_sweeper, CacheEntry, CacheStore, SharedCache, TtlCache};
pub use client::{WeatherClient, WeatherSource};
pub use retry::{with_retry, RetryConfig};
pub use types::*;
