use std::collections::HashMap;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::debug;

struct Entry<V> {
    value: V,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl<V> Entry<V> {
    fn is_fresh(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|at| now < at)
    }
}

/// In-memory string-keyed cache whose entries expire after a per-entry TTL.
///
/// Expiry is checked when an entry is read: a stale entry looks exactly like
/// an absent one and is dropped by the lookup that finds it. There is no
/// background sweeper, so stale entries that are never read again stay in
/// memory until overwritten, purged with [`purge_expired`](Self::purge_expired)
/// or cleared. Long-lived processes should bound the map with
/// [`with_max_entries`](Self::with_max_entries).
///
/// One mutex guards the whole map. It is never held across an `.await`.
/// Time comes from [`tokio::time::Instant`] so tests can drive expiry with a
/// paused clock.
pub struct TtlCache<V> {
    max_entries: Option<usize>,
    entries: Mutex<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    pub fn new() -> Self {
        Self {
            max_entries: None,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Bound the number of stored entries.
    ///
    /// When a write would exceed the bound, expired entries are purged first,
    /// then the entry closest to expiry is evicted.
    #[must_use]
    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = Some(max_entries.max(1));
        self
    }

    /// Returns the value for `key` if present and fresh.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key) {
            if entry.is_fresh(now) {
                debug!(key, "cache hit");
                return Some(entry.value.clone());
            }
            entries.remove(key);
        }
        None
    }

    /// Store `value` under `key` for `ttl`, replacing any previous entry.
    ///
    /// A zero `ttl` stores an entry that is already stale; `Duration::MAX`
    /// stores one that never expires.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        self.insert_locked(&mut entries, key.into(), value, now.checked_add(ttl), now);
    }

    /// Returns the cached value for `key`, or computes it with `make`, stores
    /// it for `ttl` and returns it.
    ///
    /// The lookup and the insert happen under one lock acquisition, so
    /// concurrent misses on the same key compute once. `make` must not touch
    /// this cache.
    pub fn get_or_insert_with<F>(&self, key: &str, ttl: Duration, make: F) -> V
    where
        F: FnOnce() -> V,
    {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key).filter(|entry| entry.is_fresh(now)) {
            debug!(key, "cache hit");
            return entry.value.clone();
        }
        let value = make();
        self.insert_locked(&mut entries, key.to_owned(), value.clone(), now.checked_add(ttl), now);
        value
    }

    /// Fallible variant of [`get_or_insert_with`](Self::get_or_insert_with).
    /// Nothing is stored when `make` fails.
    pub fn try_get_or_insert_with<F, E>(&self, key: &str, ttl: Duration, make: F) -> Result<V, E>
    where
        F: FnOnce() -> Result<V, E>,
    {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        if let Some(entry) = entries.get(key).filter(|entry| entry.is_fresh(now)) {
            debug!(key, "cache hit");
            return Ok(entry.value.clone());
        }
        let value = make()?;
        self.insert_locked(&mut entries, key.to_owned(), value.clone(), now.checked_add(ttl), now);
        Ok(value)
    }

    /// Remove `key`. Returns the removed value if it was still fresh.
    pub fn delete(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .lock()
            .remove(key)
            .filter(|entry| entry.is_fresh(now))
            .map(|entry| entry.value)
    }

    /// Remove every entry.
    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Drop stale entries. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh(now));
        let purged = before - entries.len();
        if purged > 0 {
            debug!(purged, "purged expired cache entries");
        }
        purged
    }

    /// Every fresh entry, in no particular order.
    pub fn snapshot(&self) -> Vec<(String, V)> {
        let now = Instant::now();
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| entry.is_fresh(now))
            .map(|(key, entry)| (key.clone(), entry.value.clone()))
            .collect()
    }

    /// Number of stored entries, including stale ones not yet dropped.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn insert_locked(
        &self,
        entries: &mut HashMap<String, Entry<V>>,
        key: String,
        value: V,
        expires_at: Option<Instant>,
        now: Instant,
    ) {
        if let Some(max) = self.max_entries
            && entries.len() >= max
            && !entries.contains_key(&key)
        {
            entries.retain(|_, entry| entry.is_fresh(now));
            if entries.len() >= max {
                let closest = entries
                    .iter()
                    .min_by_key(|(_, entry)| (entry.expires_at.is_none(), entry.expires_at))
                    .map(|(key, _)| key.clone());
                if let Some(closest) = closest {
                    debug!(key = %closest, max_entries = max, "cache full, evicting entry");
                    entries.remove(&closest);
                }
            }
        }
        entries.insert(key, Entry { value, expires_at });
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> std::fmt::Debug for TtlCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TtlCache")
            .field("max_entries", &self.max_entries)
            .field("len", &self.entries.lock().len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn entry_expires_without_delete() {
        let cache = TtlCache::new();
        cache.set("client:42", "acme".to_owned(), Duration::from_secs(1));
        assert_eq!(cache.get("client:42").as_deref(), Some("acme"));

        tokio::time::advance(Duration::from_millis(999)).await;
        assert!(cache.get("client:42").is_some());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert_eq!(cache.get("client:42"), None);
        // The stale lookup dropped it.
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn zero_ttl_is_never_observable() {
        let cache = TtlCache::new();
        cache.set("k", 1, Duration::ZERO);
        assert_eq!(cache.get("k"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn unrepresentable_ttl_never_expires() {
        let cache = TtlCache::new().with_max_entries(2);
        cache.set("forever", 1, Duration::MAX);
        assert_eq!(cache.get_or_insert_with("also", Duration::MAX, || 2), 2);

        tokio::time::advance(Duration::from_secs(10 * 365 * 24 * 3600)).await;
        assert_eq!(cache.get("forever"), Some(1));
        assert_eq!(cache.purge_expired(), 0);

        // Entries that do expire are evicted before the unbounded ones.
        cache.set("also", 2, MINUTE);
        cache.set("new", 3, MINUTE);
        assert_eq!(cache.get("forever"), Some(1));
        assert_eq!(cache.get("also"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn set_replaces_value_and_expiry() {
        let cache = TtlCache::new();
        cache.set("k", 1, Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;
        cache.set("k", 2, Duration::from_secs(10));
        tokio::time::advance(Duration::from_secs(8)).await;
        assert_eq!(cache.get("k"), Some(2));
    }

    #[tokio::test(start_paused = true)]
    async fn get_or_insert_with_computes_once_while_fresh() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);
        let make = || {
            calls.fetch_add(1, Ordering::SeqCst);
            "rate".to_owned()
        };

        assert_eq!(cache.get_or_insert_with("fx:EUR", Duration::from_secs(5), make), "rate");
        assert_eq!(cache.get_or_insert_with("fx:EUR", Duration::from_secs(5), make), "rate");
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(5)).await;
        cache.get_or_insert_with("fx:EUR", Duration::from_secs(5), make);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn failed_compute_stores_nothing() {
        let cache: TtlCache<u32> = TtlCache::new();
        let result: Result<u32, &str> = cache.try_get_or_insert_with("k", MINUTE, || Err("db down"));
        assert_eq!(result, Err("db down"));
        assert!(cache.is_empty());

        let result: Result<u32, &str> = cache.try_get_or_insert_with("k", MINUTE, || Ok(3));
        assert_eq!(result, Ok(3));
        assert_eq!(cache.get("k"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn purge_and_snapshot_skip_stale_entries() {
        let cache = TtlCache::new();
        cache.set("old", 1, Duration::from_secs(5));
        cache.set("new", 2, Duration::from_secs(20));
        tokio::time::advance(Duration::from_secs(10)).await;

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.snapshot(), vec![("new".to_owned(), 2)]);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn delete_and_clear() {
        let cache = TtlCache::new();
        cache.set("a", 1, MINUTE);
        cache.set("b", 2, MINUTE);
        assert_eq!(cache.delete("a"), Some(1));
        assert_eq!(cache.delete("a"), None);
        assert_eq!(cache.get("a"), None);
        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn bounded_cache_prefers_expired_then_closest_to_expiry() {
        let cache = TtlCache::new().with_max_entries(2);
        cache.set("short", 1, Duration::from_secs(5));
        cache.set("long", 2, Duration::from_secs(60));
        cache.set("mid", 3, Duration::from_secs(30));

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get("short"), None);
        assert_eq!(cache.get("long"), Some(2));
        assert_eq!(cache.get("mid"), Some(3));

        // Replacing an existing key never evicts.
        cache.set("mid", 30, Duration::from_secs(30));
        assert_eq!(cache.get("long"), Some(2));

        tokio::time::advance(Duration::from_secs(31)).await;
        cache.set("new", 4, MINUTE);
        assert_eq!(cache.get("long"), Some(2));
        assert_eq!(cache.get("new"), Some(4));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_population_computes_once() {
        let cache = Arc::new(TtlCache::new());
        let calls = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                cache.get_or_insert_with("provider:1", MINUTE, || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    7
                })
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 7);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
