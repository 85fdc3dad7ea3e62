//! Football match data synchronizer library
//!
//! This library keeps a store of football matches and their enrichment data
//! (lineups, events, statistics, highlights) in sync with an upstream sports
//! API. Every upstream response is cached with a freshness window chosen per
//! data type, concurrent identical requests share one upstream call, and
//! four recurring jobs move each match through its lifecycle.
//!
//! # Examples
//!
//! ```rust,no_run
//! use matchday_sync::config::Config;
//! use matchday_sync::data_fetcher::{ApiClient, MemoryCacheStore};
//! use matchday_sync::error::AppError;
//! use matchday_sync::feed::FeedService;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), AppError> {
//!     let config = Config::load(None).await?;
//!     let client = ApiClient::new(&config, Arc::new(MemoryCacheStore::default()))?;
//!
//!     // Reads through the cache; the second call is served locally
//!     let feed = FeedService::new(client, &config);
//!     let today = chrono::Utc::now().date_naive();
//!     for bundle in feed.feed_matches(today).await? {
//!         println!("{} vs {}", bundle.home_team.name, bundle.away_team.name);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod constants;
pub mod data_fetcher;
pub mod error;
pub mod feed;
pub mod performance;
pub mod scheduler;
pub mod store;
pub mod testing_utils;

// Re-export commonly used types for convenience
pub use config::Config;
pub use data_fetcher::api::{ApiClient, RequestDescriptor};
pub use error::AppError;
pub use scheduler::{JobKind, Scheduler};

/// Current version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
