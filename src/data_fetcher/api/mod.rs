pub mod batch;
pub mod client;
pub mod fetch_utils;
pub mod http_client;
pub mod urls;

pub use batch::{BatchReport, run_batches};
pub use client::ApiClient;
pub use fetch_utils::{backoff_delay, fetch_with_retry};
pub use http_client::create_http_client;
pub use urls::{RequestCategory, RequestDescriptor};
