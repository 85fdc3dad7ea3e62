use async_trait::async_trait;
use serde_json::Value;

use super::types::CacheStats;
use crate::error::AppError;

/// Key/value store of upstream payloads with absolute expiry.
///
/// `get` never fails: an unreadable or missing backing medium is a miss.
/// Mutations are serialized across the whole store so readers never observe
/// a half-written entry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the stored payload while it is still valid.
    async fn get(&self, key: &str) -> Option<Value>;

    /// Stores `payload` under `key`, replacing any previous entry.
    async fn set(&self, key: &str, payload: Value, ttl_seconds: u64) -> Result<(), AppError>;

    /// Removes a single entry. Returns whether one existed.
    async fn remove(&self, key: &str) -> Result<bool, AppError>;

    /// Empties the whole store.
    async fn clear(&self) -> Result<(), AppError>;

    async fn stats(&self) -> Result<CacheStats, AppError>;

    /// Drops entries past their expiry. Returns how many were removed.
    async fn prune_expired(&self) -> Result<usize, AppError>;
}
