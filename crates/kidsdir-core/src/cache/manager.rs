use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

/// Longest file-name stem kept from a cache key before the hash suffix
const MAX_STEM_LEN: usize = 64;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }

    pub fn age(&self) -> Duration {
        Utc::now() - self.cached_at
    }

    pub fn age_minutes(&self) -> i64 {
        self.age().num_minutes()
    }

    /// Older than `max_age`. Entries stamped in the future (clock skew)
    /// count as fresh.
    pub fn is_older_than(&self, max_age: Duration) -> bool {
        self.age() > max_age
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            let remaining_mins = minutes % 60;
            if remaining_mins >= 30 {
                // Round up: 1h 30m+ becomes 2h
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            let remaining_hours = (minutes % 1440) / 60;
            if remaining_hours >= 12 {
                // Round up: 1d 12h+ becomes 2d
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CachedData<U> {
        CachedData {
            data: f(self.data),
            cached_at: self.cached_at,
        }
    }
}

/// On-disk form of a cache entry. File names are lossy, so the full key
/// is kept inside the file for prefix removal.
#[derive(Serialize, Deserialize)]
struct DiskEntry<T> {
    key: String,
    data: T,
    cached_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct DiskKey {
    key: String,
}

/// JSON files on disk, one per cache key, so cached listings survive
/// restarts and can be shown offline.
#[derive(Debug, Clone)]
pub struct CacheManager {
    cache_dir: PathBuf,
}

impl CacheManager {
    pub fn new(cache_dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&cache_dir)
            .with_context(|| format!("Failed to create cache directory {}", cache_dir.display()))?;
        Ok(Self { cache_dir })
    }

    pub fn cache_dir(&self) -> &PathBuf {
        &self.cache_dir
    }

    /// Keys carry query strings and ids, so the file name is a readable
    /// stem plus a hash of the full key.
    fn cache_path(&self, key: &str) -> PathBuf {
        let stem: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .take(MAX_STEM_LEN)
            .collect();
        let digest = Sha256::digest(key.as_bytes());
        let hash: String = digest.iter().take(6).map(|b| format!("{:02x}", b)).collect();
        self.cache_dir.join(format!("{}-{}.json", stem, hash))
    }

    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<CachedData<T>>> {
        let path = self.cache_path(key);
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read cache file: {}", key))?;

        let entry: DiskEntry<T> = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse cache file: {}", key))?;

        Ok(Some(CachedData {
            data: entry.data,
            cached_at: entry.cached_at,
        }))
    }

    pub fn save<T: Serialize>(&self, key: &str, cached: &CachedData<T>) -> Result<()> {
        let path = self.cache_path(key);
        let entry = DiskEntry {
            key: key.to_string(),
            data: &cached.data,
            cached_at: cached.cached_at,
        };
        let contents = serde_json::to_string_pretty(&entry)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write cache file: {}", key))?;
        debug!(key, "Cache entry written");
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<()> {
        let path = self.cache_path(key);
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove cache file: {}", key))?;
        }
        Ok(())
    }

    /// Delete every file whose stored key starts with `prefix`.
    /// Files without a readable key are left alone.
    pub fn remove_prefix(&self, prefix: &str) -> Result<usize> {
        let mut removed = 0;
        for path in self.cache_files()? {
            let key = match std::fs::read_to_string(&path)
                .ok()
                .and_then(|contents| serde_json::from_str::<DiskKey>(&contents).ok())
            {
                Some(stored) => stored.key,
                None => {
                    debug!(path = %path.display(), "Skipping cache file without a key");
                    continue;
                }
            };
            if key.starts_with(prefix) {
                std::fs::remove_file(&path)
                    .with_context(|| format!("Failed to remove cache file: {}", key))?;
                removed += 1;
            }
        }
        debug!(prefix, removed, "Cache entries removed by prefix");
        Ok(removed)
    }

    /// Delete every cache file (the session file is not touched)
    pub fn clear(&self) -> Result<usize> {
        let mut removed = 0;
        for path in self.cache_files()? {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
        Ok(removed)
    }

    fn cache_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(&self.cache_dir)? {
            let path = entry?.path();
            let is_cache_file = path.extension().map(|e| e == "json").unwrap_or(false)
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n != "session.json")
                    .unwrap_or(false);
            if is_cache_file {
                files.push(path);
            }
        }
        Ok(files)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cached_data_age_display_just_now() {
        let cached = CachedData::new(vec![1, 2, 3]);
        assert_eq!(cached.age_display(), "just now");
    }

    #[test]
    fn test_cached_data_age_display_rounding() {
        let mut cached = CachedData::new(());
        cached.cached_at = Utc::now() - Duration::minutes(95);
        assert_eq!(cached.age_display(), "2h ago");
        cached.cached_at = Utc::now() - Duration::minutes(15);
        assert_eq!(cached.age_display(), "15m ago");
        cached.cached_at = Utc::now() - Duration::hours(50);
        assert_eq!(cached.age_display(), "2d ago");
    }

    #[test]
    fn test_is_older_than() {
        let fresh = CachedData::new(vec![1]);
        assert!(!fresh.is_older_than(Duration::minutes(5)));

        let mut old = CachedData::new(vec![1]);
        old.cached_at = Utc::now() - Duration::minutes(61);
        assert!(old.is_older_than(Duration::minutes(60)));

        let mut skewed = CachedData::new(vec![1]);
        skewed.cached_at = Utc::now() + Duration::minutes(10);
        assert!(!skewed.is_older_than(Duration::zero()));
    }

    #[test]
    fn test_disk_round_trip_keeps_timestamp() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = CacheManager::new(dir.path().to_path_buf()).expect("manager");

        let mut cached = CachedData::new(vec!["a".to_string()]);
        cached.cached_at = Utc::now() - Duration::minutes(30);
        manager.save("search?age=5", &cached).expect("save");

        let loaded: CachedData<Vec<String>> =
            manager.load("search?age=5").expect("load").expect("present");
        assert_eq!(loaded.data, cached.data);
        assert_eq!(loaded.cached_at, cached.cached_at);

        assert!(manager.load::<Vec<String>>("search?age=6").expect("load").is_none());
    }

    #[test]
    fn test_similar_keys_do_not_collide() {
        let dir = tempfile::tempdir().expect("tempdir");
        let manager = CacheManager::new(dir.path().to_path_buf()).expect("manager");
        manager.save("a/b", &CachedData::new(1)).expect("save");
        manager.save("a?b", &CachedData::new(2)).expect("save");
        assert_eq!(manager.load::<i32>("a/b").expect("load").map(|c| c.data), Some(1));
        assert_eq!(manager.load::<i32>("a?b").expect("load").map(|c| c.data), Some(2));
    }

    #[test]
    fn test_remove_prefix_uses_stored_keys() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("session.json"), "{}").expect("write session");
        std::fs::write(dir.path().join("legacy.json"), "[1]").expect("write legacy");
        let manager = CacheManager::new(dir.path().to_path_buf()).expect("manager");
        manager.save("activities/a1", &CachedData::new(1)).expect("save");
        manager.save("activities/a/2", &CachedData::new(2)).expect("save");
        manager.save("areas", &CachedData::new(3)).expect("save");

        assert_eq!(manager.remove_prefix("activities/").expect("remove"), 2);
        assert!(manager.load::<i32>("activities/a1").expect("load").is_none());
        assert!(manager.load::<i32>("activities/a/2").expect("load").is_none());
        assert_eq!(manager.load::<i32>("areas").expect("load").map(|c| c.data), Some(3));
        assert!(dir.path().join("session.json").exists());
        assert!(dir.path().join("legacy.json").exists());
    }

    #[test]
    fn test_remove_and_clear() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("session.json"), "{}").expect("write session");
        let manager = CacheManager::new(dir.path().to_path_buf()).expect("manager");
        manager.save("one", &CachedData::new(1)).expect("save");
        manager.save("two", &CachedData::new(2)).expect("save");

        manager.remove("one").expect("remove");
        assert!(manager.load::<i32>("one").expect("load").is_none());

        assert_eq!(manager.clear().expect("clear"), 1);
        assert!(dir.path().join("session.json").exists());
    }
}
