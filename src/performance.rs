use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free counters for the API client.
///
/// Shared by every clone of a client; updated on the request path without
/// taking any lock.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    upstream_calls: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    coalesced: AtomicU64,
    retries: AtomicU64,
    failures: AtomicU64,
    total_response_ms: AtomicU64,
}

/// Point-in-time copy of [`RequestMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub upstream_calls: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub coalesced: u64,
    pub retries: u64,
    pub failures: u64,
    pub average_response_time_ms: f64,
    pub cache_hit_rate: f64,
}

impl RequestMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// One outbound HTTP attempt and how long it took.
    pub fn record_upstream_call(&self, response_time: Duration) {
        self.upstream_calls.fetch_add(1, Ordering::Relaxed);
        let millis = u64::try_from(response_time.as_millis()).unwrap_or(u64::MAX);
        self.total_response_ms.fetch_add(millis, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self) {
        self.cache_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_miss(&self) {
        self.cache_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// A caller that joined a request already in flight.
    pub fn record_coalesced(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_retry(&self) {
        self.retries.fetch_add(1, Ordering::Relaxed);
    }

    /// A request that settled with an error after all attempts.
    pub fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let upstream_calls = self.upstream_calls.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let total_response_ms = self.total_response_ms.load(Ordering::Relaxed);

        let lookups = cache_hits + cache_misses;
        MetricsSnapshot {
            upstream_calls,
            cache_hits,
            cache_misses,
            coalesced: self.coalesced.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            average_response_time_ms: if upstream_calls == 0 {
                0.0
            } else {
                total_response_ms as f64 / upstream_calls as f64
            },
            cache_hit_rate: if lookups == 0 {
                0.0
            } else {
                cache_hits as f64 / lookups as f64
            },
        }
    }
}
