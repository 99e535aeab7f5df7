//! Time-bounded in-memory cache.
//!
//! `TtlCache` is an immutable value: every mutation returns a new cache and
//! leaves the original untouched. `SharedCache` is the process-wide holder
//! of record, publishing the newest snapshot to concurrent readers.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Upper bound applied to TTLs so `Instant` arithmetic cannot overflow.
const MAX_TTL: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now > self.expires_at
    }
}

/// Key/value map with a per-entry expiry supplied at write time.
#[derive(Debug, Clone)]
pub struct TtlCache<V> {
    entries: HashMap<String, CacheEntry<V>>,
}

impl<V> Default for TtlCache<V> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    /// Look up `key` as of `now`. Expired entries read as absent but stay
    /// in place until the next sweep.
    pub fn get_at(&self, key: &str, now: Instant) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
            .map(|entry| entry.value.clone())
    }

    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) -> Self {
        self.set_at(key, value, ttl, Instant::now())
    }

    pub fn set_at(&self, key: impl Into<String>, value: V, ttl: Duration, now: Instant) -> Self {
        let mut entries = self.entries.clone();
        entries.insert(
            key.into(),
            CacheEntry {
                value,
                expires_at: now + ttl.min(MAX_TTL),
            },
        );
        Self { entries }
    }

    pub fn remove(&self, key: &str) -> Self {
        let mut entries = self.entries.clone();
        entries.remove(key);
        Self { entries }
    }

    pub fn clear(&self) -> Self {
        Self::new()
    }

    pub fn sweep(&self) -> Self {
        self.sweep_at(Instant::now())
    }

    /// Keep only the entries still live at `now`.
    pub fn sweep_at(&self, now: Instant) -> Self {
        let entries = self
            .entries
            .iter()
            .filter(|(_, entry)| !entry.is_expired_at(now))
            .map(|(key, entry)| (key.clone(), entry.clone()))
            .collect();
        Self { entries }
    }

    /// Physically stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Cache interface the enrichment path depends on.
///
/// Implementations must be safe under concurrent readers and writers.
pub trait CacheStore<V>: Send + Sync {
    fn get(&self, key: &str) -> Option<V>;

    fn set(&self, key: &str, value: V, ttl: Duration);

    fn remove(&self, key: &str);

    fn clear(&self);

    /// Drop expired entries, returning how many were evicted.
    fn sweep(&self) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-memory `CacheStore` that swaps immutable `TtlCache` snapshots.
///
/// Readers clone the current `Arc` and never observe a half-applied write.
/// Writers hold the write lock only while building the next snapshot.
#[derive(Debug)]
pub struct SharedCache<V> {
    state: RwLock<Arc<TtlCache<V>>>,
}

impl<V: Clone> Default for SharedCache<V> {
    fn default() -> Self {
        Self {
            state: RwLock::new(Arc::new(TtlCache::new())),
        }
    }
}

impl<V: Clone> SharedCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// The currently published cache state.
    pub fn snapshot(&self) -> Arc<TtlCache<V>> {
        self.state.read().clone()
    }

    fn publish(&self, update: impl FnOnce(&TtlCache<V>) -> TtlCache<V>) {
        let mut state = self.state.write();
        let current: &TtlCache<V> = &state;
        let next = update(current);
        *state = Arc::new(next);
    }
}

impl<V: Clone + Send + Sync> CacheStore<V> for SharedCache<V> {
    fn get(&self, key: &str) -> Option<V> {
        self.snapshot().get(key)
    }

    fn set(&self, key: &str, value: V, ttl: Duration) {
        self.publish(|cache| cache.set(key, value, ttl));
    }

    fn remove(&self, key: &str) {
        self.publish(|cache| cache.remove(key));
    }

    fn clear(&self) {
        self.publish(TtlCache::clear);
    }

    fn sweep(&self) -> usize {
        let mut evicted = 0;
        self.publish(|cache| {
            let swept = cache.sweep();
            evicted = cache.len() - swept.len();
            swept
        });
        evicted
    }

    fn len(&self) -> usize {
        self.snapshot().len()
    }
}

/// Run `sweep()` on `cache` every `every`, starting one interval from now.
pub fn spawn_sweeper<V: 'static>(
    cache: Arc<dyn CacheStore<V>>,
    every: Duration,
) -> JoinHandle<()> {
    let every = every.max(Duration::from_millis(1));
    tracing::info!("Starting cache sweeper with {:?} interval", every);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let evicted = cache.sweep();
            tracing::debug!(evicted, remaining = cache.len(), "Cache sweep complete");
        }
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_set_then_get() {
        let cache = TtlCache::new().set("k", 42, HOUR);
        assert_eq!(cache.get("k"), Some(42));
        assert_eq!(cache.get("missing"), None);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let now = Instant::now();
        let cache = TtlCache::new().set_at("k", "v", HOUR, now);

        assert_eq!(cache.get_at("k", now + HOUR), Some("v"));
        assert_eq!(cache.get_at("k", now + HOUR + Duration::from_millis(1)), None);
    }

    #[test]
    fn test_expired_read_leaves_entry_in_place() {
        let now = Instant::now();
        let cache = TtlCache::new().set_at("k", 1, Duration::from_secs(1), now);

        assert_eq!(cache.get_at("k", now + Duration::from_secs(5)), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_updates_do_not_mutate_original() {
        let original = TtlCache::new().set("a", 1, HOUR);
        let updated = original.set("b", 2, HOUR);
        let removed = updated.remove("a");

        assert_eq!(original.get("b"), None);
        assert_eq!(updated.get("a"), Some(1));
        assert_eq!(removed.get("a"), None);
        assert_eq!(removed.get("b"), Some(2));
    }

    #[test]
    fn test_overwrite_resets_expiry() {
        let now = Instant::now();
        let cache = TtlCache::new()
            .set_at("k", 1, Duration::from_secs(10), now)
            .set_at("k", 2, HOUR, now + Duration::from_secs(5));

        assert_eq!(cache.get_at("k", now + Duration::from_secs(60)), Some(2));
    }

    #[test]
    fn test_sweep_keeps_live_entries() {
        let now = Instant::now();
        let cache = TtlCache::new()
            .set_at("short", 1, Duration::from_secs(1), now)
            .set_at("long", 2, HOUR, now);

        let swept = cache.sweep_at(now + Duration::from_secs(2));

        assert_eq!(swept.len(), 1);
        assert_eq!(swept.get_at("long", now + Duration::from_secs(2)), Some(2));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_sweep_before_expiry_removes_nothing() {
        let now = Instant::now();
        let cache = TtlCache::new()
            .set_at("a", 1, HOUR, now)
            .set_at("b", 2, HOUR, now);

        assert_eq!(cache.sweep_at(now + HOUR).len(), 2);
    }

    #[test]
    fn test_huge_ttl_does_not_overflow() {
        let cache = TtlCache::new().set("k", 1, Duration::MAX);
        assert_eq!(cache.get("k"), Some(1));
    }

    #[test]
    fn test_clear() {
        let cache = TtlCache::new().set("a", 1, HOUR).set("b", 2, HOUR);
        assert!(cache.clear().is_empty());
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_shared_cache_roundtrip() {
        let cache = SharedCache::new();
        cache.set("k", 7, HOUR);
        assert_eq!(cache.get("k"), Some(7));

        cache.remove("k");
        assert_eq!(cache.get("k"), None);

        cache.set("a", 1, HOUR);
        cache.set("b", 2, HOUR);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_shared_cache_snapshot_is_stable() {
        let cache = SharedCache::new();
        cache.set("a", 1, HOUR);
        let before = cache.snapshot();

        cache.set("b", 2, HOUR);

        assert_eq!(before.get("b"), None);
        assert_eq!(cache.snapshot().get("b"), Some(2));
    }

    #[test]
    fn test_shared_cache_sweep_counts_evictions() {
        let cache = SharedCache::new();
        cache.set("gone", 1, Duration::ZERO);
        cache.set("kept", 2, HOUR);
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(cache.sweep(), 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("kept"), Some(2));
    }

    #[test]
    fn test_shared_cache_concurrent_writers() {
        let cache = Arc::new(SharedCache::new());

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for i in 0..50 {
                        cache.set(&format!("{}-{}", t, i), i, HOUR);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(cache.len(), 400);
        assert_eq!(cache.get("3-49"), Some(49));
    }

    #[derive(Default)]
    struct CountingStore {
        sweeps: AtomicUsize,
    }

    impl CacheStore<i32> for CountingStore {
        fn get(&self, _key: &str) -> Option<i32> {
            None
        }
        fn set(&self, _key: &str, _value: i32, _ttl: Duration) {}
        fn remove(&self, _key: &str) {}
        fn clear(&self) {}
        fn sweep(&self) -> usize {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            0
        }
        fn len(&self) -> usize {
            0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_runs_on_interval() {
        let store = Arc::new(CountingStore::default());
        let handle = spawn_sweeper(store.clone() as Arc<dyn CacheStore<i32>>, HOUR);

        tokio::time::sleep(HOUR * 3 + Duration::from_secs(1)).await;

        assert_eq!(store.sweeps.load(Ordering::SeqCst), 3);
        handle.abort();
    }
}
