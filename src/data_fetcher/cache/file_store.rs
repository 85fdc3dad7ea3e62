//! Durable cache backed by a single JSON document on disk.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use super::store::CacheStore;
use super::types::{CacheEntry, CacheStats};
use crate::error::AppError;

/// On-disk layout of the cache file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(default)]
    entries: BTreeMap<String, CacheEntry>,
}

/// Cache store persisting every entry in one JSON file.
///
/// All operations, reads included, hold one store-wide lock. Writes go to a
/// sibling temp file which is then renamed over the document, so the file on
/// disk is always either the old or the new complete document.
pub struct FileCacheStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    /// Reads the document. A missing or corrupt file yields an empty one.
    async fn read_document(&self) -> Result<CacheDocument, AppError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("Cache file {} does not exist yet", self.path.display());
                return Ok(CacheDocument::default());
            }
            Err(e) => return Err(e.into()),
        };

        if content.trim().is_empty() {
            return Ok(CacheDocument::default());
        }

        match serde_json::from_str::<CacheDocument>(&content) {
            Ok(document) => Ok(document),
            Err(e) => {
                warn!(
                    "Cache file {} is corrupt, treating as empty: {}",
                    self.path.display(),
                    e
                );
                Ok(CacheDocument::default())
            }
        }
    }

    async fn write_document(&self, document: &CacheDocument) -> Result<(), AppError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string(document)?;
        let temp = self.temp_path();
        fs::write(&temp, json).await?;
        fs::rename(&temp, &self.path).await.map_err(|e| {
            AppError::cache_store(format!(
                "Failed to replace cache file {}: {}",
                self.path.display(),
                e
            ))
        })?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for FileCacheStore {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn get(&self, key: &str) -> Option<Value> {
        let _guard = self.lock.lock().await;

        if !fs::try_exists(&self.path).await.unwrap_or(false) {
            // Initialize the medium so later readers find a valid document
            if let Err(e) = self.write_document(&CacheDocument::default()).await {
                debug!("Could not initialize cache file: {}", e);
            }
            return None;
        }

        let document = match self.read_document().await {
            Ok(document) => document,
            Err(e) => {
                warn!("Cache read failed, treating as miss: {}", e);
                return None;
            }
        };

        match document.entries.get(key) {
            Some(entry) if entry.is_valid_at(Utc::now()) => {
                debug!("Cache hit: key={}", key);
                Some(entry.payload.clone())
            }
            Some(_) => {
                debug!("Cache entry expired: key={}", key);
                None
            }
            None => {
                debug!("Cache miss: key={}", key);
                None
            }
        }
    }

    #[instrument(skip(self, payload), fields(path = %self.path.display()))]
    async fn set(&self, key: &str, payload: Value, ttl_seconds: u64) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        document.entries.insert(
            key.to_string(),
            CacheEntry::new(key, payload, ttl_seconds, Utc::now()),
        );
        self.write_document(&document).await?;
        debug!("Cached entry: key={}, ttl={}s", key, ttl_seconds);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, AppError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        let removed = document.entries.remove(key).is_some();
        if removed {
            self.write_document(&document).await?;
        }
        Ok(removed)
    }

    async fn clear(&self) -> Result<(), AppError> {
        let _guard = self.lock.lock().await;
        self.write_document(&CacheDocument::default()).await?;
        info!("Cleared cache file {}", self.path.display());
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, AppError> {
        let _guard = self.lock.lock().await;
        let document = self.read_document().await?;
        Ok(CacheStats::from_entries(document.entries.values(), Utc::now()))
    }

    async fn prune_expired(&self) -> Result<usize, AppError> {
        let _guard = self.lock.lock().await;
        let mut document = self.read_document().await?;
        let now = Utc::now();
        let before = document.entries.len();
        document.entries.retain(|_, entry| entry.is_valid_at(now));
        let pruned = before - document.entries.len();
        if pruned > 0 {
            self.write_document(&document).await?;
            info!("Pruned {} expired cache entries", pruned);
        }
        Ok(pruned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_set_then_get_round_trip() {
        let dir = tempdir().unwrap();
        let store = FileCacheStore::new(dir.path().join("cache.json"));
        let payload = json!([{"id": 1, "homeTeam": {"name": "Liverpool"}}]);

        store.set("/matches?date=2024-08-17", payload.clone(), 300).await.unwrap();

        assert_eq!(store.get("/matches?date=2024-08-17").await, Some(payload));
        assert_eq!(store.get("/matches?date=2024-08-18").await, None);
    }

    #[tokio::test]
    async fn test_expired_entry_is_a_miss_but_stays_on_disk() {
        let dir = tempdir().unwrap();
        let store = FileCacheStore::new(dir.path().join("cache.json"));

        store.set("key", json!("stale"), 0).await.unwrap();

        assert_eq!(store.get("key").await, None);
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.expired, 1);
    }

    #[tokio::test]
    async fn test_entry_written_in_the_past_expires() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let old = CacheEntry::new("old", json!(1), 60, Utc::now() - Duration::minutes(5));
        let fresh = CacheEntry::new("fresh", json!(2), 600, Utc::now());
        let document = json!({"entries": {"old": old, "fresh": fresh}});
        tokio::fs::write(&path, document.to_string()).await.unwrap();

        let store = FileCacheStore::new(&path);
        assert_eq!(store.get("old").await, None);
        assert_eq!(store.get("fresh").await, Some(json!(2)));

        assert_eq!(store.prune_expired().await.unwrap(), 1);
        let stats = store.stats().await.unwrap();
        assert_eq!(stats.total, 1);
        assert_eq!(stats.valid, 1);
    }

    #[tokio::test]
    async fn test_missing_file_is_initialized_on_get() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let store = FileCacheStore::new(&path);

        assert_eq!(store.get("anything").await, None);
        assert!(path.exists());
        assert_eq!(store.stats().await.unwrap(), CacheStats::default());
    }

    #[tokio::test]
    async fn test_set_creates_missing_parent_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("cache.json");
        let store = FileCacheStore::new(&path);

        store.set("k", json!({"ok": true}), 60).await.unwrap();
        assert!(path.exists());
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_miss_and_gets_rewritten() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.json");
        tokio::fs::write(&path, "{not json").await.unwrap();
        let store = FileCacheStore::new(&path);

        assert_eq!(store.get("k").await, None);

        store.set("k", json!(5), 60).await.unwrap();
        assert_eq!(store.get("k").await, Some(json!(5)));
    }

    #[tokio::test]
    async fn test_overwrite_replaces_whole_entry() {
        let dir = tempdir().unwrap();
        let store = FileCacheStore::new(dir.path().join("cache.json"));

        store.set("k", json!({"a": 1, "b": 2}), 60).await.unwrap();
        store.set("k", json!({"a": 3}), 60).await.unwrap();

        assert_eq!(store.get("k").await, Some(json!({"a": 3})));
    }

    #[tokio::test]
    async fn test_remove_and_clear() {
        let dir = tempdir().unwrap();
        let store = FileCacheStore::new(dir.path().join("cache.json"));
        store.set("a", json!(1), 60).await.unwrap();
        store.set("b", json!(2), 60).await.unwrap();

        assert!(store.remove("a").await.unwrap());
        assert!(!store.remove("a").await.unwrap());
        assert_eq!(store.get("b").await, Some(json!(2)));

        store.clear().await.unwrap();
        assert_eq!(store.get("b").await, None);
        assert_eq!(store.stats().await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_concurrent_writers_keep_every_entry() {
        let dir = tempdir().unwrap();
        let store = Arc::new(FileCacheStore::new(dir.path().join("cache.json")));

        let writers: Vec<_> = (0..16)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.set(&format!("key-{i}"), json!(i), 60).await })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        assert_eq!(store.stats().await.unwrap().total, 16);
        for i in 0..16 {
            assert_eq!(store.get(&format!("key-{i}")).await, Some(json!(i)));
        }
    }
}
