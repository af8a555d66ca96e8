//! Keyed in-memory cache with a stale-while-revalidate read path.
//!
//! Entries are stored as JSON values so one cache can hold every entity
//! type. There is no eviction beyond the per-read `max_age` check and no
//! capacity bound. The maps sit behind `std::sync::Mutex`es that are never
//! held across an `.await`.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::manager::{CacheManager, CachedData};

/// Default freshness window for repository reads
const DEFAULT_MAX_AGE_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_age: Duration,
    pub stale_while_revalidate: bool,
}

impl CachePolicy {
    pub fn new(max_age: Duration, stale_while_revalidate: bool) -> Self {
        Self {
            max_age,
            stale_while_revalidate,
        }
    }

    /// Always go to the network, still recording the result
    pub fn network_only() -> Self {
        Self::new(Duration::zero(), false)
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::new(Duration::minutes(DEFAULT_MAX_AGE_MINUTES), true)
    }
}

/// Where a value handed back by [`MemoryCache::fetch`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Fetched just now.
    Fresh,
    /// Served from cache within `max_age`.
    Cached,
    /// Served past `max_age`; a background refresh is under way.
    Stale,
}

#[derive(Debug, Clone)]
pub struct Fetched<T> {
    pub data: T,
    pub freshness: Freshness,
    pub cached_at: DateTime<Utc>,
}

struct Inner {
    entries: Mutex<HashMap<String, CachedData<Value>>>,
    refreshing: Mutex<HashSet<String>>,
    disk: Option<CacheManager>,
}

/// Clone is cheap; clones share the same entries.
#[derive(Clone)]
pub struct MemoryCache {
    inner: Arc<Inner>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // A panic while holding the lock cannot leave a map half-updated
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Write-through to disk; misses fall back to the disk copy.
    pub fn with_disk(disk: CacheManager) -> Self {
        Self::build(Some(disk))
    }

    fn build(disk: Option<CacheManager>) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                refreshing: Mutex::new(HashSet::new()),
                disk,
            }),
        }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<CachedData<T>> {
        let raw = self.get_raw(key)?;
        match serde_json::from_value(raw.data) {
            Ok(data) => Some(CachedData {
                data,
                cached_at: raw.cached_at,
            }),
            Err(e) => {
                warn!(key, error = %e, "Cached entry has unexpected shape, ignoring");
                None
            }
        }
    }

    fn get_raw(&self, key: &str) -> Option<CachedData<Value>> {
        if let Some(entry) = lock(&self.inner.entries).get(key) {
            return Some(entry.clone());
        }

        let disk = self.inner.disk.as_ref()?;
        match disk.load::<Value>(key) {
            Ok(Some(entry)) => {
                debug!(key, "Cache warmed from disk");
                lock(&self.inner.entries).insert(key.to_string(), entry.clone());
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                debug!(key, error = %e, "Failed to load disk cache entry");
                None
            }
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, data: &T) {
        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        let entry = CachedData::new(value);
        if let Some(ref disk) = self.inner.disk {
            if let Err(e) = disk.save(key, &entry) {
                warn!(key, error = %e, "Failed to write disk cache entry");
            }
        }
        lock(&self.inner.entries).insert(key.to_string(), entry);
    }

    pub fn invalidate(&self, key: &str) {
        lock(&self.inner.entries).remove(key);
        if let Some(ref disk) = self.inner.disk {
            if let Err(e) = disk.remove(key) {
                warn!(key, error = %e, "Failed to remove disk cache entry");
            }
        }
    }

    /// Drop every entry whose key starts with `prefix`, e.g. all pages of
    /// one listing after a write. Disk entries go too, including ones this
    /// process never loaded.
    pub fn invalidate_prefix(&self, prefix: &str) {
        lock(&self.inner.entries).retain(|k, _| !k.starts_with(prefix));
        if let Some(ref disk) = self.inner.disk {
            if let Err(e) = disk.remove_prefix(prefix) {
                warn!(prefix, error = %e, "Failed to remove disk cache entries");
            }
        }
    }

    pub fn clear(&self) {
        lock(&self.inner.entries).clear();
        if let Some(ref disk) = self.inner.disk {
            if let Err(e) = disk.clear() {
                warn!(error = %e, "Failed to clear disk cache");
            }
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_refreshing(&self, key: &str) -> bool {
        lock(&self.inner.refreshing).contains(key)
    }

    /// Any background refresh still running
    pub fn has_pending_refresh(&self) -> bool {
        !lock(&self.inner.refreshing).is_empty()
    }

    /// Read through the cache.
    ///
    /// - entry within `max_age`: returned, `fetcher` never runs
    /// - no entry, or stale without SWR: `fetcher` runs now; its error is returned
    /// - stale with SWR: the stale value is returned immediately and
    ///   `fetcher` runs in a spawned task (at most one per key); a failed
    ///   background fetch leaves the stale entry in place
    pub async fn fetch<T, E, F, Fut>(
        &self,
        key: &str,
        policy: CachePolicy,
        fetcher: F,
    ) -> Result<Fetched<T>, E>
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        E: std::fmt::Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if let Some(entry) = self.get::<T>(key) {
            if !entry.is_older_than(policy.max_age) {
                debug!(key, "Cache hit");
                return Ok(Fetched {
                    data: entry.data,
                    freshness: Freshness::Cached,
                    cached_at: entry.cached_at,
                });
            }
            if policy.stale_while_revalidate {
                debug!(key, age_minutes = entry.age_minutes(), "Serving stale entry, revalidating");
                self.spawn_refresh(key.to_string(), fetcher);
                return Ok(Fetched {
                    data: entry.data,
                    freshness: Freshness::Stale,
                    cached_at: entry.cached_at,
                });
            }
        }

        debug!(key, "Cache miss");
        let data = fetcher().await?;
        self.put(key, &data);
        Ok(Fetched {
            data,
            freshness: Freshness::Fresh,
            cached_at: Utc::now(),
        })
    }

    fn spawn_refresh<T, E, F, Fut>(&self, key: String, fetcher: F)
    where
        T: Serialize + Send + 'static,
        E: std::fmt::Display + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        if !lock(&self.inner.refreshing).insert(key.clone()) {
            debug!(key = %key, "Refresh already in flight");
            return;
        }

        let cache = self.clone();
        tokio::spawn(async move {
            match fetcher().await {
                Ok(data) => {
                    cache.put(&key, &data);
                    debug!(key = %key, "Background refresh stored");
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Background refresh failed, keeping stale entry");
                }
            }
            lock(&cache.inner.refreshing).remove(&key);
        });
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_fetcher(
        calls: &Arc<AtomicUsize>,
        value: &'static str,
    ) -> impl FnOnce() -> std::future::Ready<Result<String, String>> + Send + 'static {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(Ok(value.to_string()))
        }
    }

    fn age_entry(cache: &MemoryCache, key: &str, minutes: i64) {
        let mut entries = lock(&cache.inner.entries);
        let entry = entries.get_mut(key).expect("entry present");
        entry.cached_at = Utc::now() - Duration::minutes(minutes);
    }

    async fn wait_for_refresh(cache: &MemoryCache, key: &str) {
        for _ in 0..100 {
            if !cache.is_refreshing(key) {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        panic!("refresh for {} never finished", key);
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let cache = MemoryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = CachePolicy::new(Duration::minutes(5), false);

        let first = cache
            .fetch("k", policy, counting_fetcher(&calls, "v1"))
            .await
            .expect("fetch");
        assert_eq!(first.data, "v1");
        assert_eq!(first.freshness, Freshness::Fresh);

        let second = cache
            .fetch("k", policy, counting_fetcher(&calls, "v2"))
            .await
            .expect("fetch");
        assert_eq!(second.data, "v1");
        assert_eq!(second.freshness, Freshness::Cached);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_without_swr_refetches() {
        let cache = MemoryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = CachePolicy::new(Duration::minutes(5), false);

        cache.put("k", &"old".to_string());
        age_entry(&cache, "k", 10);

        let result = cache
            .fetch("k", policy, counting_fetcher(&calls, "new"))
            .await
            .expect("fetch");
        assert_eq!(result.data, "new");
        assert_eq!(result.freshness, Freshness::Fresh);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stale_while_revalidate_serves_stale_then_updates() {
        let cache = MemoryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let policy = CachePolicy::new(Duration::minutes(5), true);

        cache.put("k", &"old".to_string());
        age_entry(&cache, "k", 10);

        let result = cache
            .fetch("k", policy, counting_fetcher(&calls, "new"))
            .await
            .expect("fetch");
        assert_eq!(result.data, "old");
        assert_eq!(result.freshness, Freshness::Stale);

        wait_for_refresh(&cache, "k").await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let next = cache
            .fetch("k", policy, counting_fetcher(&calls, "newer"))
            .await
            .expect("fetch");
        assert_eq!(next.data, "new");
        assert_eq!(next.freshness, Freshness::Cached);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_background_refresh_keeps_stale_entry() {
        let cache = MemoryCache::new();
        let policy = CachePolicy::new(Duration::minutes(5), true);
        cache.put("k", &"old".to_string());
        age_entry(&cache, "k", 10);

        let result = cache
            .fetch("k", policy, || async { Err::<String, _>("offline".to_string()) })
            .await
            .expect("stale value");
        assert_eq!(result.data, "old");

        wait_for_refresh(&cache, "k").await;
        let entry: CachedData<String> = cache.get("k").expect("still cached");
        assert_eq!(entry.data, "old");
    }

    #[tokio::test]
    async fn test_miss_propagates_fetch_error() {
        let cache = MemoryCache::new();
        let result = cache
            .fetch("k", CachePolicy::default(), || async {
                Err::<String, _>("boom".to_string())
            })
            .await;
        assert_eq!(result.err().as_deref(), Some("boom"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_invalidate_prefix() {
        let cache = MemoryCache::new();
        cache.put("activities?limit=10", &1);
        cache.put("activities?limit=20", &2);
        cache.put("organizations", &3);
        cache.invalidate_prefix("activities");
        assert_eq!(cache.len(), 1);
        assert!(cache.get::<i32>("organizations").is_some());
    }

    #[test]
    fn test_disk_backed_cache_survives_new_instance() {
        let dir = tempfile::tempdir().expect("tempdir");
        let disk = CacheManager::new(dir.path().to_path_buf()).expect("disk");
        MemoryCache::with_disk(disk.clone()).put("categories", &vec!["art", "sport"]);

        let reopened = MemoryCache::with_disk(disk);
        let entry: CachedData<Vec<String>> = reopened.get("categories").expect("from disk");
        assert_eq!(entry.data, vec!["art".to_string(), "sport".to_string()]);
        assert_eq!(reopened.len(), 1);
    }

    #[test]
    fn test_invalidate_prefix_reaches_unloaded_disk_entries() {
        let dir = tempfile::tempdir().expect("tempdir");
        let disk = CacheManager::new(dir.path().to_path_buf()).expect("disk");
        let writer = MemoryCache::with_disk(disk.clone());
        writer.put("search?age=5", &vec!["old row"]);
        writer.put("activities/a1", &"old activity");
        writer.put("categories", &1);

        // Nothing loaded into this instance's memory
        let invalidator = MemoryCache::with_disk(disk.clone());
        invalidator.invalidate_prefix("activities/");
        invalidator.invalidate_prefix("search");

        let reader = MemoryCache::with_disk(disk);
        assert!(reader.get::<Vec<String>>("search?age=5").is_none());
        assert!(reader.get::<String>("activities/a1").is_none());
        assert!(reader.get::<i32>("categories").is_some());
    }

    #[test]
    fn test_shape_mismatch_is_a_miss() {
        let cache = MemoryCache::new();
        cache.put("k", &"text");
        assert!(cache.get::<Vec<i32>>("k").is_none());
    }
}
