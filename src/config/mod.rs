use crate::constants::{self, env_vars};
use crate::data_fetcher::models::League;
use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;

pub mod paths;
pub mod validation;

use paths::{get_cache_file_path, get_config_path, get_log_dir_path};
use validation::validate_config;

/// Configuration structure for the synchronizer.
/// Handles loading, saving, and managing settings.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Base URL of the upstream sports API. Should include the scheme.
    pub api_base_url: String,
    /// API key sent with every upstream request.
    #[serde(default)]
    pub api_key: String,
    /// Header name carrying the API key.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    /// Optional upstream host header value (RapidAPI style gateways).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_host: Option<String>,
    /// Path to the log file. If not specified, logs will be written to a default location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file_path: Option<String>,
    /// Path to the durable cache document. Defaults to the config directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_file_path: Option<String>,
    /// HTTP timeout in seconds for API requests. Defaults to 30 seconds if not specified.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default)]
    pub batch: BatchSettings,
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    /// Leagues tracked by the discovery job.
    #[serde(default)]
    pub leagues: Vec<LeagueConfig>,
}

/// Retry and backoff tuning for upstream calls.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts per request, the first one included.
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub rate_limit_multiplier: u32,
    pub max_delay_seconds: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: constants::retry::MAX_ATTEMPTS,
            base_delay_ms: constants::retry::BASE_DELAY_MS,
            rate_limit_multiplier: constants::retry::RATE_LIMIT_MULTIPLIER,
            max_delay_seconds: constants::retry::MAX_DELAY_SECONDS,
        }
    }
}

impl RetrySettings {
    pub fn max_delay(&self) -> Duration {
        Duration::from_secs(self.max_delay_seconds)
    }
}

/// Chunking used when warming many cache entries at once.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct BatchSettings {
    pub size: usize,
    pub delay_ms: u64,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            size: constants::batch::DEFAULT_SIZE,
            delay_ms: constants::batch::DEFAULT_DELAY_MS,
        }
    }
}

impl BatchSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// Cadences and selection windows of the lifecycle jobs.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct SchedulerSettings {
    pub discovery_interval_seconds: u64,
    pub lineup_interval_seconds: u64,
    pub live_interval_seconds: u64,
    pub post_match_interval_seconds: u64,
    pub discovery_days_back: i64,
    pub discovery_days_ahead: i64,
    pub lineup_window_min_minutes: i64,
    pub lineup_window_max_minutes: i64,
    pub post_match_lookback_hours: i64,
    pub live_overdue_hours: i64,
    /// Matches processed concurrently inside one job run.
    pub stage_concurrency: usize,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        use constants::scheduler as s;
        Self {
            discovery_interval_seconds: s::DISCOVERY_INTERVAL_SECONDS,
            lineup_interval_seconds: s::LINEUP_INTERVAL_SECONDS,
            live_interval_seconds: s::LIVE_INTERVAL_SECONDS,
            post_match_interval_seconds: s::POST_MATCH_INTERVAL_SECONDS,
            discovery_days_back: s::DISCOVERY_DAYS_BACK,
            discovery_days_ahead: s::DISCOVERY_DAYS_AHEAD,
            lineup_window_min_minutes: s::LINEUP_WINDOW_MIN_MINUTES,
            lineup_window_max_minutes: s::LINEUP_WINDOW_MAX_MINUTES,
            post_match_lookback_hours: s::POST_MATCH_LOOKBACK_HOURS,
            live_overdue_hours: s::LIVE_OVERDUE_HOURS,
            stage_concurrency: s::STAGE_CONCURRENCY,
        }
    }
}

/// A league the discovery job keeps in sync.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct LeagueConfig {
    pub id: i64,
    pub name: String,
    pub season: i32,
}

impl From<&LeagueConfig> for League {
    fn from(league: &LeagueConfig) -> Self {
        League {
            id: league.id,
            name: league.name.clone(),
            season: league.season,
        }
    }
}

/// Default HTTP timeout in seconds
fn default_http_timeout() -> u64 {
    constants::DEFAULT_HTTP_TIMEOUT_SECONDS
}

fn default_api_key_header() -> String {
    constants::DEFAULT_API_KEY_HEADER.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url: String::new(),
            api_key: String::new(),
            api_key_header: default_api_key_header(),
            api_host: None,
            log_file_path: None,
            cache_file_path: None,
            http_timeout_seconds: default_http_timeout(),
            retry: RetrySettings::default(),
            batch: BatchSettings::default(),
            scheduler: SchedulerSettings::default(),
            leagues: Vec::new(),
        }
    }
}

impl Config {
    /// Loads configuration from `custom_path` or the default config file location.
    /// A missing file is not an error: defaults plus environment variables are used.
    ///
    /// # Environment Variables
    /// - `MATCHDAY_API_KEY` - Override API key
    /// - `MATCHDAY_API_BASE_URL` - Override API base URL
    /// - `MATCHDAY_LOG_FILE` - Override log file path
    /// - `MATCHDAY_HTTP_TIMEOUT` - Override HTTP timeout in seconds (default: 30)
    /// - `MATCHDAY_CACHE_FILE` - Override cache file path
    ///
    /// # Returns
    /// * `Ok(Config)` - Successfully loaded and validated configuration
    /// * `Err(AppError)` - Error occurred during load, or validation failed
    pub async fn load(custom_path: Option<&str>) -> Result<Self, AppError> {
        let config = Self::read(custom_path).await?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load) without validation, for commands that
    /// don't talk to the upstream API.
    pub async fn read(custom_path: Option<&str>) -> Result<Self, AppError> {
        let config_path = custom_path
            .map(str::to_string)
            .unwrap_or_else(get_config_path);

        let mut config = if Path::new(&config_path).exists() {
            Self::load_from_path(&config_path).await?
        } else {
            Config::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Applies environment variable overrides on top of file values.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(api_key) = std::env::var(env_vars::API_KEY) {
            self.api_key = api_key;
        }

        if let Ok(base_url) = std::env::var(env_vars::API_BASE_URL) {
            self.api_base_url = base_url;
        }

        if let Ok(log_file_path) = std::env::var(env_vars::LOG_FILE) {
            self.log_file_path = Some(log_file_path);
        }

        if let Ok(cache_file_path) = std::env::var(env_vars::CACHE_FILE) {
            self.cache_file_path = Some(cache_file_path);
        }

        if let Some(timeout) = std::env::var(env_vars::HTTP_TIMEOUT)
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
        {
            self.http_timeout_seconds = timeout;
        }
    }

    /// Validates the configuration settings
    ///
    /// # Returns
    /// * `Ok(())` - Configuration is valid
    /// * `Err(AppError)` - Configuration validation failed
    pub fn validate(&self) -> Result<(), AppError> {
        validate_config(self)
    }

    /// Base URL without a trailing slash, with a scheme.
    pub fn normalized_base_url(&self) -> String {
        let trimmed = self.api_base_url.trim_end_matches('/');
        if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
            trimmed.to_string()
        } else {
            format!("https://{trimmed}")
        }
    }

    /// Resolved location of the durable cache document.
    pub fn cache_path(&self) -> String {
        self.cache_file_path
            .clone()
            .unwrap_or_else(get_cache_file_path)
    }

    /// Returns the platform-specific path for the log directory.
    pub fn get_log_dir_path() -> String {
        paths::get_log_dir_path()
    }

    /// Displays current configuration settings to stdout.
    /// The API key is masked.
    pub fn display(&self) {
        let log_dir = get_log_dir_path();
        println!("\nCurrent Configuration");
        println!("────────────────────────────────────");
        println!("API Base URL:");
        println!("{}", self.normalized_base_url());
        println!("────────────────────────────────────");
        println!("API Key:");
        println!("{}", mask_secret(&self.api_key));
        println!("────────────────────────────────────");
        println!("HTTP Timeout:");
        println!("{} seconds", self.http_timeout_seconds);
        println!("────────────────────────────────────");
        println!("Cache File:");
        println!("{}", self.cache_path());
        println!("────────────────────────────────────");
        println!("Tracked Leagues:");
        if self.leagues.is_empty() {
            println!("(none)");
        }
        for league in &self.leagues {
            println!("{} - {} ({})", league.id, league.name, league.season);
        }
        println!("────────────────────────────────────");
        println!("Log File Location:");
        if let Some(custom_path) = &self.log_file_path {
            println!("{custom_path}");
        } else {
            println!("{log_dir}/{}", constants::LOG_FILE_NAME);
            println!("(Default location)");
        }
    }

    /// Saves configuration to a file path.
    ///
    /// Creates the parent directory if it doesn't exist.
    ///
    /// # Errors
    /// * `AppError::Config` - If the provided path has no parent directory
    /// * `AppError::Io` - If there's an I/O error creating directories or writing the file
    /// * `AppError::TomlSerialize` - If there's an error serializing the configuration
    pub async fn save_to_path(&self, path: &str) -> Result<(), AppError> {
        let config_dir = Path::new(path).parent().ok_or_else(|| {
            AppError::config_error(format!("Path '{path}' has no parent directory"))
        })?;

        if !config_dir.as_os_str().is_empty() && !config_dir.exists() {
            fs::create_dir_all(config_dir).await?;
        }
        let content = toml::to_string_pretty(self)?;
        let mut file = fs::File::create(path).await?;
        file.write_all(content.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }

    /// Loads configuration from a custom file path without env overrides or validation.
    pub async fn load_from_path(path: &str) -> Result<Self, AppError> {
        let content = fs::read_to_string(path).await?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

fn mask_secret(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}****")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    fn sample_config() -> Config {
        Config {
            api_base_url: "https://api.example.com".to_string(),
            api_key: "secret-key".to_string(),
            leagues: vec![LeagueConfig {
                id: 39,
                name: "Premier League".to_string(),
                season: 2024,
            }],
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_config_load_existing_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let config_path_str = config_path.to_string_lossy();

        let config_content = r#"
api_base_url = "https://api.example.com"
api_key = "abc123"
log_file_path = "/custom/log/path"

[retry]
max_attempts = 5

[[leagues]]
id = 140
name = "La Liga"
season = 2024
"#;
        tokio::fs::write(&config_path, config_content).await.unwrap();

        let config = Config::load_from_path(&config_path_str).await.unwrap();

        assert_eq!(config.api_base_url, "https://api.example.com");
        assert_eq!(config.api_key, "abc123");
        assert_eq!(config.log_file_path, Some("/custom/log/path".to_string()));
        assert_eq!(config.retry.max_attempts, 5);
        // Unspecified fields in a section fall back to defaults
        assert_eq!(config.retry.base_delay_ms, constants::retry::BASE_DELAY_MS);
        assert_eq!(config.leagues.len(), 1);
        assert_eq!(config.leagues[0].name, "La Liga");
        assert_eq!(config.api_key_header, constants::DEFAULT_API_KEY_HEADER);
    }

    #[tokio::test]
    async fn test_config_save_and_load_roundtrip() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");
        let config_path_str = config_path.to_string_lossy();
        let original = sample_config();

        original.save_to_path(&config_path_str).await.unwrap();
        assert!(config_path.exists());

        let loaded = Config::load_from_path(&config_path_str).await.unwrap();
        assert_eq!(original.api_base_url, loaded.api_base_url);
        assert_eq!(original.api_key, loaded.api_key);
        assert_eq!(original.leagues, loaded.leagues);
        assert_eq!(original.scheduler, loaded.scheduler);
    }

    #[tokio::test]
    async fn test_config_malformed_toml_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        tokio::fs::write(&config_path, "api_base_url = [unclosed")
            .await
            .unwrap();

        let result = Config::load_from_path(&config_path.to_string_lossy()).await;
        assert!(matches!(result.unwrap_err(), AppError::TomlDeserialize(_)));
    }

    #[tokio::test]
    async fn test_config_load_from_nonexistent_path() {
        let result = Config::load_from_path("/nonexistent/matchday/config.toml").await;
        assert!(matches!(result.unwrap_err(), AppError::Io(_)));
    }

    #[test]
    fn test_normalized_base_url() {
        let mut config = sample_config();
        config.api_base_url = "api.example.com/".to_string();
        assert_eq!(config.normalized_base_url(), "https://api.example.com");

        config.api_base_url = "http://localhost:8080/".to_string();
        assert_eq!(config.normalized_base_url(), "http://localhost:8080");
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret(""), "(not set)");
        assert_eq!(mask_secret("abcdefgh"), "abcd****");
    }

    #[tokio::test]
    #[serial]
    async fn test_environment_variable_override() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let config_path_str = config_path.to_string_lossy().to_string();
        sample_config().save_to_path(&config_path_str).await.unwrap();

        unsafe {
            std::env::set_var(env_vars::API_KEY, "env-key");
            std::env::set_var(env_vars::HTTP_TIMEOUT, "12");
            std::env::set_var(env_vars::CACHE_FILE, "/tmp/matchday-cache.json");
        }

        let result = Config::load(Some(&config_path_str)).await;

        unsafe {
            std::env::remove_var(env_vars::API_KEY);
            std::env::remove_var(env_vars::HTTP_TIMEOUT);
            std::env::remove_var(env_vars::CACHE_FILE);
        }

        let config = result.unwrap();
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.http_timeout_seconds, 12);
        assert_eq!(config.cache_path(), "/tmp/matchday-cache.json");
    }

    #[tokio::test]
    #[serial]
    async fn test_load_without_api_key_is_configuration_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let config_path_str = config_path.to_string_lossy().to_string();
        let mut config = sample_config();
        config.api_key = String::new();
        config.save_to_path(&config_path_str).await.unwrap();

        let result = Config::load(Some(&config_path_str)).await;
        assert!(matches!(result.unwrap_err(), AppError::Config(_)));
    }
}
