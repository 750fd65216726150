//! A small TTL key-value cache owned by its caller, backed by `moka`.

use std::time::{Duration, Instant};

use moka::sync::Cache;
use moka::Expiry;

const DEFAULT_MAX_ENTRIES: u64 = 10_000;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    ttl: Duration,
}

/// Expires each entry after the TTL it was stored with.
struct PerEntryTtl;

impl<V> Expiry<String, Entry<V>> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _created_at: Instant,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry<V>,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Thread-safe cache whose entries expire after a per-entry TTL.
///
/// Construct one per owner and pass it by reference to whatever needs it.
pub struct TtlCache<V> {
    inner: Cache<String, Entry<V>>,
}

impl<V: Clone + Send + Sync + 'static> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("entries", &self.inner.entry_count())
            .finish()
    }
}

impl<V: Clone + Send + Sync + 'static> Default for TtlCache<V> {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }
}

impl<V: Clone + Send + Sync + 'static> TtlCache<V> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cache holding at most `max_entries` values.
    #[must_use]
    pub fn with_capacity(max_entries: u64) -> Self {
        Self {
            inner: Cache::builder()
                .max_capacity(max_entries)
                .expire_after(PerEntryTtl)
                .build(),
        }
    }

    /// Returns the cached value if present and not yet expired.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        self.inner.get(key).map(|entry| entry.value)
    }

    /// Stores `value` under `key` for `ttl`. A zero TTL stores nothing.
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        self.inner.insert(key.to_string(), Entry { value, ttl });
    }

    /// Number of live entries, after pending expirations are applied.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.run_pending_tasks();
        usize::try_from(self.inner.entry_count()).unwrap_or(usize::MAX)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn returns_value_before_expiry() {
        let cache = TtlCache::new();
        cache.set("q:pinata", vec![1, 2, 3], Duration::from_secs(60));
        assert_eq!(cache.get("q:pinata"), Some(vec![1, 2, 3]));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn missing_key_is_absent() {
        let cache: TtlCache<u32> = TtlCache::new();
        assert!(cache.get("nope").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn expired_entry_is_absent_and_evicted() {
        let cache = TtlCache::new();
        cache.set("stale", "v".to_string(), Duration::from_millis(20));
        cache.set("fresh", "w".to_string(), Duration::from_secs(60));
        std::thread::sleep(Duration::from_millis(100));

        assert!(cache.get("stale").is_none());
        assert_eq!(cache.get("fresh"), Some("w".to_string()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn zero_ttl_stores_nothing() {
        let cache = TtlCache::new();
        cache.set("k", 1_u8, Duration::ZERO);
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn set_overwrites_existing_entry() {
        let cache = TtlCache::new();
        cache.set("k", 1_u8, Duration::from_secs(60));
        cache.set("k", 2_u8, Duration::from_secs(60));
        assert_eq!(cache.get("k"), Some(2));
    }

    #[test]
    fn overwrite_takes_the_new_ttl() {
        let cache = TtlCache::new();
        cache.set("k", 1_u8, Duration::from_secs(60));
        cache.set("k", 2_u8, Duration::from_millis(20));
        std::thread::sleep(Duration::from_millis(100));
        assert!(cache.get("k").is_none());
    }
}
