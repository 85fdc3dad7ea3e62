pub mod file_store;
pub mod memory_store;
pub mod store;
pub mod ttl_policy;
pub mod types;

pub use file_store::FileCacheStore;
pub use memory_store::MemoryCacheStore;
pub use store::CacheStore;
pub use ttl_policy::ttl_for;
pub use types::{CacheEntry, CacheStats};
