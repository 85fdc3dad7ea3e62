pub mod api;
pub mod cache;
pub mod models;
pub mod processors;

pub use api::{ApiClient, RequestCategory, RequestDescriptor, run_batches};
pub use cache::{CacheStore, FileCacheStore, MemoryCacheStore, ttl_for};
