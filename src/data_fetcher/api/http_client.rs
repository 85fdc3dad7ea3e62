//! HTTP client creation and configuration utilities

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;

use crate::config::Config;
use crate::constants::{API_HOST_HEADER, HTTP_POOL_MAX_IDLE_PER_HOST};
use crate::error::AppError;

/// Creates the upstream HTTP client with timeout, connection pooling and the
/// authentication headers installed as defaults.
///
/// # Errors
/// * `AppError::Config` - when the header name or key is not a valid header
/// * `AppError::ApiFetch` - when the client cannot be built
pub fn create_http_client(config: &Config) -> Result<Client, AppError> {
    let headers = auth_headers(config)?;
    let client = Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_seconds))
        .pool_max_idle_per_host(HTTP_POOL_MAX_IDLE_PER_HOST)
        .default_headers(headers)
        .build()?;
    Ok(client)
}

fn auth_headers(config: &Config) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::new();

    let name = HeaderName::from_bytes(config.api_key_header.trim().as_bytes()).map_err(|e| {
        AppError::config_error(format!(
            "Invalid API key header name '{}': {}",
            config.api_key_header, e
        ))
    })?;
    let mut value = HeaderValue::from_str(config.api_key.trim())
        .map_err(|e| AppError::config_error(format!("API key is not a valid header value: {e}")))?;
    value.set_sensitive(true);
    headers.insert(name, value);

    if let Some(host) = &config.api_host {
        let value = HeaderValue::from_str(host.trim()).map_err(|e| {
            AppError::config_error(format!("API host is not a valid header value: {e}"))
        })?;
        headers.insert(HeaderName::from_static(API_HOST_HEADER), value);
    }

    Ok(headers)
}
