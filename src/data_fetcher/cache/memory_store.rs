use async_trait::async_trait;
use chrono::Utc;
use lru::LruCache;
use serde_json::Value;
use std::num::NonZeroUsize;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use super::store::CacheStore;
use super::types::{CacheEntry, CacheStats};
use crate::constants::cache_store::MEMORY_CAPACITY;
use crate::error::AppError;

/// In-process cache bounded by an LRU. Contents do not survive a restart.
pub struct MemoryCacheStore {
    entries: RwLock<LruCache<String, CacheEntry>>,
}

impl MemoryCacheStore {
    /// Creates a store holding at most `capacity` entries (minimum one).
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: RwLock::new(LruCache::new(capacity)),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn capacity(&self) -> usize {
        self.entries.read().await.cap().get()
    }
}

impl Default for MemoryCacheStore {
    fn default() -> Self {
        Self::new(MEMORY_CAPACITY)
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    #[instrument(skip(self))]
    async fn get(&self, key: &str) -> Option<Value> {
        // LRU lookups reorder entries, so even reads take the write lock
        let mut cache = self.entries.write().await;
        let entry = cache.get(key)?;
        if entry.is_valid_at(Utc::now()) {
            debug!("Cache hit: key={}", key);
            Some(entry.payload.clone())
        } else {
            debug!("Cache entry expired, evicting: key={}", key);
            cache.pop(key);
            None
        }
    }

    #[instrument(skip(self, payload))]
    async fn set(&self, key: &str, payload: Value, ttl_seconds: u64) -> Result<(), AppError> {
        let entry = CacheEntry::new(key, payload, ttl_seconds, Utc::now());
        self.entries.write().await.put(key.to_string(), entry);
        debug!("Cached entry: key={}, ttl={}s", key, ttl_seconds);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<bool, AppError> {
        Ok(self.entries.write().await.pop(key).is_some())
    }

    async fn clear(&self) -> Result<(), AppError> {
        self.entries.write().await.clear();
        Ok(())
    }

    async fn stats(&self) -> Result<CacheStats, AppError> {
        let cache = self.entries.read().await;
        Ok(CacheStats::from_entries(cache.iter().map(|(_, entry)| entry), Utc::now()))
    }

    async fn prune_expired(&self) -> Result<usize, AppError> {
        let mut cache = self.entries.write().await;
        let now = Utc::now();
        let expired: Vec<String> = cache
            .iter()
            .filter(|(_, entry)| !entry.is_valid_at(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            cache.pop(key);
        }
        Ok(expired.len())
    }
}
