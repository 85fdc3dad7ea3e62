//! Cache-aware upstream client with in-flight request coalescing

use chrono::Utc;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use reqwest::Client;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{debug, instrument, warn};

use super::fetch_utils::fetch_with_retry;
use super::http_client::create_http_client;
use super::urls::RequestDescriptor;
use crate::config::{Config, RetrySettings};
use crate::data_fetcher::cache::{CacheStore, ttl_for};
use crate::error::AppError;
use crate::performance::{MetricsSnapshot, RequestMetrics};

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<Value>, Arc<AppError>>>>;

/// Upstream API client.
///
/// Concurrent requests with the same fingerprint share one upstream call:
/// the first caller registers an in-flight future, later callers await it.
/// Successful payloads are written through to the cache with the lifetime
/// from [`ttl_for`]. Cloning is cheap and clones share cache, in-flight map
/// and metrics.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    http: Client,
    base_url: String,
    retry: RetrySettings,
    cache: Arc<dyn CacheStore>,
    in_flight: Mutex<HashMap<String, SharedFetch>>,
    metrics: RequestMetrics,
}

/// Removes the in-flight marker when the leading fetch settles or is dropped.
struct InFlightGuard {
    inner: Arc<ClientInner>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let mut in_flight = self
            .inner
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.remove(&self.key);
    }
}

impl ApiClient {
    /// Builds a client from configuration, including auth headers and timeout.
    pub fn new(config: &Config, cache: Arc<dyn CacheStore>) -> Result<Self, AppError> {
        let http = create_http_client(config)?;
        Ok(Self::with_http_client(
            http,
            config.normalized_base_url(),
            config.retry.clone(),
            cache,
        ))
    }

    pub fn with_http_client(
        http: Client,
        base_url: impl Into<String>,
        retry: RetrySettings,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                http,
                base_url: base_url.into().trim_end_matches('/').to_string(),
                retry,
                cache,
                in_flight: Mutex::new(HashMap::new()),
                metrics: RequestMetrics::new(),
            }),
        }
    }

    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.inner.cache
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.inner.metrics.snapshot()
    }

    /// Number of requests currently in flight.
    pub fn in_flight_count(&self) -> usize {
        self.inner.lock_in_flight().len()
    }

    /// Returns the payload for `descriptor`, from cache when still valid.
    ///
    /// # Errors
    /// * `AppError::ApiNotFound` - upstream has no data (404 or empty body)
    /// * other variants - the failure after all retry attempts
    #[instrument(skip(self), fields(request = %descriptor))]
    pub async fn request(&self, descriptor: &RequestDescriptor) -> Result<Value, AppError> {
        self.execute(descriptor, true).await
    }

    /// Like [`request`](Self::request) but skips the cache read. The fresh
    /// payload is still written through and concurrent callers still coalesce.
    #[instrument(skip(self), fields(request = %descriptor))]
    pub async fn request_fresh(&self, descriptor: &RequestDescriptor) -> Result<Value, AppError> {
        self.execute(descriptor, false).await
    }

    async fn execute(&self, descriptor: &RequestDescriptor, use_cache: bool) -> Result<Value, AppError> {
        let key = descriptor.fingerprint();

        let existing = self.inner.lock_in_flight().get(&key).cloned();
        if let Some(pending) = existing {
            debug!("Joining in-flight request: {}", key);
            self.inner.metrics.record_coalesced();
            return settle(pending.await);
        }

        if use_cache {
            if let Some(payload) = self.inner.cache.get(&key).await {
                debug!("Cache hit: {}", key);
                self.inner.metrics.record_cache_hit();
                return Ok(payload);
            }
            self.inner.metrics.record_cache_miss();
        }

        let (pending, leader) = self.register(&key, descriptor, use_cache);
        if !leader {
            debug!("Joining in-flight request registered during cache lookup: {}", key);
            self.inner.metrics.record_coalesced();
        }
        settle(pending.await)
    }

    /// Returns the in-flight future for `key`, starting one if none exists.
    /// The flag is true when this call started it.
    fn register(&self, key: &str, descriptor: &RequestDescriptor, use_cache: bool) -> (SharedFetch, bool) {
        let mut in_flight = self.inner.lock_in_flight();
        if let Some(existing) = in_flight.get(key) {
            return (existing.clone(), false);
        }

        let inner = Arc::clone(&self.inner);
        let descriptor = descriptor.clone();
        let guard_key = key.to_string();
        // Spawned so the upstream call completes even if every caller is dropped.
        // The guard's drop waits on the map lock held here, so the marker
        // cannot be removed before it is inserted.
        let task = tokio::spawn(async move {
            let _guard = InFlightGuard {
                inner: Arc::clone(&inner),
                key: guard_key,
            };
            inner
                .fetch_and_store(&descriptor, use_cache)
                .await
                .map(Arc::new)
                .map_err(Arc::new)
        });

        let pending: SharedFetch = async move {
            match task.await {
                Ok(result) => result,
                Err(e) => Err(Arc::new(AppError::Custom(format!(
                    "Upstream request task failed: {e}"
                )))),
            }
        }
        .boxed()
        .shared();

        in_flight.insert(key.to_string(), pending.clone());
        (pending, true)
    }
}

impl ClientInner {
    fn lock_in_flight(&self) -> std::sync::MutexGuard<'_, HashMap<String, SharedFetch>> {
        self.in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn fetch_and_store(&self, descriptor: &RequestDescriptor, use_cache: bool) -> Result<Value, AppError> {
        let key = descriptor.fingerprint();

        // A previous leader may have completed between our cache check and registration
        if use_cache && let Some(payload) = self.cache.get(&key).await {
            return Ok(payload);
        }

        let payload =
            fetch_with_retry(&self.http, &self.base_url, descriptor, &self.retry, &self.metrics).await?;

        let ttl = ttl_for(descriptor, Utc::now().date_naive());
        if let Err(e) = self.cache.set(&key, payload.clone(), ttl).await {
            warn!("Failed to cache response for {}: {}", key, e);
        }
        Ok(payload)
    }
}

/// Unwraps a shared fetch result. The last handle to settle receives the
/// original value; earlier ones get copies.
fn settle(result: Result<Arc<Value>, Arc<AppError>>) -> Result<Value, AppError> {
    match result {
        Ok(payload) => Ok(Arc::try_unwrap(payload).unwrap_or_else(|shared| Value::clone(&shared))),
        Err(error) => Err(Arc::try_unwrap(error).unwrap_or_else(|shared| shared.replicate())),
    }
}
