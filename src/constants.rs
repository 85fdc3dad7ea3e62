//! Application-wide constants and configuration defaults
//!
//! This module centralizes the freshness windows, retry tuning and scheduler
//! cadences so the policy functions and the config defaults agree.

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;

/// Maximum number of connections per host in the HTTP client pool
pub const HTTP_POOL_MAX_IDLE_PER_HOST: usize = 16;

/// Default header carrying the upstream API key
pub const DEFAULT_API_KEY_HEADER: &str = "x-rapidapi-key";

/// Header carrying the upstream host when one is configured
pub const API_HOST_HEADER: &str = "x-rapidapi-host";

/// File name of the rolling log when no custom path is configured
pub const LOG_FILE_NAME: &str = "matchday_sync.log";

/// Filter directive applied when RUST_LOG does not say otherwise
pub const DEFAULT_LOG_DIRECTIVE: &str = "matchday_sync=info";

/// Cache TTL (Time To Live) values in seconds, one per data category
pub mod cache_ttl {
    /// Matches on today's date change constantly while games are played
    pub const TODAY_MATCHES_SECONDS: u64 = 300;

    /// Matches on any other date (past results or future fixtures)
    pub const OTHER_DATE_MATCHES_SECONDS: u64 = 1800;

    /// Single match lookups used by live polling
    pub const LIVE_MATCH_SECONDS: u64 = 300;

    /// League tables
    pub const STANDINGS_SECONDS: u64 = 3600;

    /// Highlight clips trickle in for a few hours after full time
    pub const HIGHLIGHTS_SECONDS: u64 = 7200;

    /// League and team metadata
    pub const STATIC_SECONDS: u64 = 86400;

    /// Statistics and match events
    pub const STATISTICS_SECONDS: u64 = 300;

    /// Lineups are announced shortly before kickoff and static afterwards
    pub const LINEUPS_SECONDS: u64 = 3600;

    /// Fallback for anything uncategorized
    pub const DEFAULT_SECONDS: u64 = 900;
}

/// Cache store sizing
pub mod cache_store {
    /// Capacity of the in-process LRU cache backend
    pub const MEMORY_CAPACITY: usize = 512;

    /// File name of the durable cache document
    pub const FILE_NAME: &str = "api_cache.json";
}

/// Environment variable names
pub mod env_vars {
    /// Upstream API key
    pub const API_KEY: &str = "MATCHDAY_API_KEY";

    /// Upstream base URL override
    pub const API_BASE_URL: &str = "MATCHDAY_API_BASE_URL";

    /// Log file path override
    pub const LOG_FILE: &str = "MATCHDAY_LOG_FILE";

    /// HTTP timeout override in seconds
    pub const HTTP_TIMEOUT: &str = "MATCHDAY_HTTP_TIMEOUT";

    /// Cache file path override
    pub const CACHE_FILE: &str = "MATCHDAY_CACHE_FILE";
}

/// Retry configuration
pub mod retry {
    /// Total number of upstream attempts, the first one included
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 1000;

    /// Maximum delay between retries (seconds)
    pub const MAX_DELAY_SECONDS: u64 = 30;

    /// Extra multiplier applied to the backoff after a 429
    pub const RATE_LIMIT_MULTIPLIER: u32 = 4;

    /// Jitter range applied to each backoff delay (+/- fraction)
    pub const JITTER_FRACTION: f64 = 0.2;
}

/// Batch executor defaults
pub mod batch {
    /// Calls executed concurrently per chunk
    pub const DEFAULT_SIZE: usize = 3;

    /// Pause between chunks (milliseconds)
    pub const DEFAULT_DELAY_MS: u64 = 1000;
}

/// Scheduler cadences and selection windows
pub mod scheduler {
    /// Discovery runs twice a day (and once on startup)
    pub const DISCOVERY_INTERVAL_SECONDS: u64 = 12 * 60 * 60;

    /// Lineup polling cadence
    pub const LINEUP_INTERVAL_SECONDS: u64 = 5 * 60;

    /// Live score polling cadence
    pub const LIVE_INTERVAL_SECONDS: u64 = 60;

    /// Post-match backfill cadence
    pub const POST_MATCH_INTERVAL_SECONDS: u64 = 10 * 60;

    /// Days before today included in discovery
    pub const DISCOVERY_DAYS_BACK: i64 = 1;

    /// Days after today included in discovery
    pub const DISCOVERY_DAYS_AHEAD: i64 = 5;

    /// Lineup lookahead window lower bound (minutes until kickoff)
    pub const LINEUP_WINDOW_MIN_MINUTES: i64 = 50;

    /// Lineup lookahead window upper bound (minutes until kickoff)
    pub const LINEUP_WINDOW_MAX_MINUTES: i64 = 60;

    /// Finished matches updated within this many hours get backfilled
    pub const POST_MATCH_LOOKBACK_HOURS: i64 = 6;

    /// Scheduled matches whose kickoff passed within this many hours are polled as live
    pub const LIVE_OVERDUE_HOURS: i64 = 3;

    /// Matches processed concurrently within a single job run
    pub const STAGE_CONCURRENCY: usize = 4;
}
