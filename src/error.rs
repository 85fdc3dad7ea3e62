use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Failed to fetch data from API: {0}")]
    ApiFetch(#[from] reqwest::Error),

    #[error("Failed to parse JSON: {0}")]
    ApiParse(#[from] serde_json::Error),

    // Specific HTTP status code errors
    #[error("API request not found (404): {url}")]
    ApiNotFound { url: String },

    #[error("API server error ({status}): {message} (URL: {url})")]
    ApiServerError {
        status: u16,
        message: String,
        url: String,
    },

    #[error("API client error ({status}): {message} (URL: {url})")]
    ApiClientError {
        status: u16,
        message: String,
        url: String,
    },

    #[error("API rate limit exceeded (429): {message} (URL: {url})")]
    ApiRateLimit { message: String, url: String },

    #[error("API service unavailable ({status}): {message} (URL: {url})")]
    ApiServiceUnavailable {
        status: u16,
        message: String,
        url: String,
    },

    // Network-specific errors
    #[error("Network timeout while fetching data from: {url}")]
    NetworkTimeout { url: String },

    #[error("Connection failed to: {url} - {message}")]
    NetworkConnection { url: String, message: String },

    // Data parsing and validation errors
    #[error("API returned malformed JSON: {message} (URL: {url})")]
    ApiMalformedJson { message: String, url: String },

    // Persistence and cache errors
    #[error("Persistence error for {entity}: {message}")]
    Persistence { entity: String, message: String },

    #[error("Cache store error: {0}")]
    CacheStore(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeserialize(#[from] toml::de::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Date/time parsing error: {0}")]
    DateTimeParse(String),

    #[error("Log setup error: {0}")]
    LogSetup(String),

    #[error("{0}")]
    Custom(String),
}

impl AppError {
    /// Create a configuration error with context
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a date/time parsing error with context
    pub fn datetime_parse_error(msg: impl Into<String>) -> Self {
        Self::DateTimeParse(msg.into())
    }

    /// Create a log setup error with context
    pub fn log_setup_error(msg: impl Into<String>) -> Self {
        Self::LogSetup(msg.into())
    }

    /// Create an API not found error
    pub fn api_not_found(url: impl Into<String>) -> Self {
        Self::ApiNotFound { url: url.into() }
    }

    /// Create an API server error (5xx status codes)
    pub fn api_server_error(
        status: u16,
        message: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self::ApiServerError {
            status,
            message: message.into(),
            url: url.into(),
        }
    }

    /// Create an API client error (4xx status codes except 404 and 429)
    pub fn api_client_error(
        status: u16,
        message: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self::ApiClientError {
            status,
            message: message.into(),
            url: url.into(),
        }
    }

    /// Create an API rate limit error
    pub fn api_rate_limit(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::ApiRateLimit {
            message: message.into(),
            url: url.into(),
        }
    }

    /// Create an API service unavailable error
    pub fn api_service_unavailable(
        status: u16,
        message: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self::ApiServiceUnavailable {
            status,
            message: message.into(),
            url: url.into(),
        }
    }

    /// Create a network timeout error
    pub fn network_timeout(url: impl Into<String>) -> Self {
        Self::NetworkTimeout { url: url.into() }
    }

    /// Create a network connection error
    pub fn network_connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NetworkConnection {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a malformed JSON error
    pub fn api_malformed_json(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::ApiMalformedJson {
            message: message.into(),
            url: url.into(),
        }
    }

    /// Create a persistence error for a store entity
    pub fn persistence(entity: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence {
            entity: entity.into(),
            message: message.into(),
        }
    }

    /// Create a cache store error
    pub fn cache_store(msg: impl Into<String>) -> Self {
        Self::CacheStore(msg.into())
    }

    /// Check if error is retryable (network issues, server errors, rate limits)
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::NetworkTimeout { .. }
                | AppError::NetworkConnection { .. }
                | AppError::ApiServerError { .. }
                | AppError::ApiServiceUnavailable { .. }
                | AppError::ApiRateLimit { .. }
        )
    }

    /// Check if error is an upstream rate limit (429)
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, AppError::ApiRateLimit { .. })
    }

    /// Check if error indicates data not found (legitimate absence, not a failure)
    pub fn is_not_found(&self) -> bool {
        matches!(self, AppError::ApiNotFound { .. })
    }

    /// HTTP status code carried by upstream errors, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            AppError::ApiNotFound { .. } => Some(404),
            AppError::ApiRateLimit { .. } => Some(429),
            AppError::ApiServerError { status, .. }
            | AppError::ApiClientError { status, .. }
            | AppError::ApiServiceUnavailable { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Builds an equivalent error for a coalesced waiter.
    ///
    /// Upstream failures are reproduced exactly so waiters can still classify
    /// them; errors wrapping library types are flattened to their message.
    pub fn replicate(&self) -> Self {
        match self {
            AppError::ApiNotFound { url } => AppError::api_not_found(url.clone()),
            AppError::ApiServerError {
                status,
                message,
                url,
            } => AppError::api_server_error(*status, message.clone(), url.clone()),
            AppError::ApiClientError {
                status,
                message,
                url,
            } => AppError::api_client_error(*status, message.clone(), url.clone()),
            AppError::ApiRateLimit { message, url } => {
                AppError::api_rate_limit(message.clone(), url.clone())
            }
            AppError::ApiServiceUnavailable {
                status,
                message,
                url,
            } => AppError::api_service_unavailable(*status, message.clone(), url.clone()),
            AppError::NetworkTimeout { url } => AppError::network_timeout(url.clone()),
            AppError::NetworkConnection { url, message } => {
                AppError::network_connection(url.clone(), message.clone())
            }
            AppError::ApiMalformedJson { message, url } => {
                AppError::api_malformed_json(message.clone(), url.clone())
            }
            AppError::Persistence { entity, message } => {
                AppError::persistence(entity.clone(), message.clone())
            }
            AppError::CacheStore(msg) => AppError::cache_store(msg.clone()),
            AppError::Config(msg) => AppError::config_error(msg.clone()),
            AppError::DateTimeParse(msg) => AppError::datetime_parse_error(msg.clone()),
            AppError::LogSetup(msg) => AppError::log_setup_error(msg.clone()),
            other => AppError::Custom(other.to_string()),
        }
    }
}
