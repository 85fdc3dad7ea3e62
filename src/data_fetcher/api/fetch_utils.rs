//! Upstream GET with bounded retry, backoff and status classification

use rand::Rng;
use reqwest::{Client, Response, StatusCode};
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::{debug, error, instrument, warn};

use super::urls::RequestDescriptor;
use crate::config::RetrySettings;
use crate::constants::retry::JITTER_FRACTION;
use crate::data_fetcher::processors::extract_payload;
use crate::error::AppError;
use crate::performance::RequestMetrics;

/// A failed attempt together with any server-provided wait.
struct AttemptError {
    error: AppError,
    retry_after: Option<Duration>,
}

impl From<AppError> for AttemptError {
    fn from(error: AppError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

/// Delay before retry number `attempt` (zero-based), without jitter.
///
/// `base * 2^attempt`, multiplied by the rate-limit multiplier for 429s and
/// capped at `max_delay`.
pub fn backoff_delay(retry: &RetrySettings, attempt: u32, rate_limited: bool) -> Duration {
    let factor = 2u64.saturating_pow(attempt);
    let mut millis = retry.base_delay_ms.saturating_mul(factor);
    if rate_limited {
        millis = millis.saturating_mul(u64::from(retry.rate_limit_multiplier));
    }
    Duration::from_millis(millis).min(retry.max_delay())
}

/// Spreads `delay` by up to ±20 % so retries from parallel callers do not align.
fn with_jitter(delay: Duration) -> Duration {
    if delay.is_zero() {
        return delay;
    }
    let factor = 1.0 + rand::rng().random_range(-JITTER_FRACTION..=JITTER_FRACTION);
    delay.mul_f64(factor.max(0.0))
}

/// Numeric `Retry-After` header in seconds.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Fetches `descriptor` and returns its payload.
///
/// Makes at most `retry.max_attempts` attempts in total. Rate limits,
/// 5xx responses, timeouts and connection failures are retried with
/// exponential backoff; a `Retry-After` header on a 429 replaces the computed
/// delay. 404 and an empty 2xx body surface as `AppError::ApiNotFound`.
#[instrument(skip(client, base_url, retry, metrics), fields(request = %descriptor))]
pub async fn fetch_with_retry(
    client: &Client,
    base_url: &str,
    descriptor: &RequestDescriptor,
    retry: &RetrySettings,
    metrics: &RequestMetrics,
) -> Result<Value, AppError> {
    let url = descriptor.url(base_url);
    let max_attempts = retry.max_attempts.max(1);
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let started = Instant::now();
        let outcome = send_once(client, base_url, descriptor, &url).await;
        metrics.record_upstream_call(started.elapsed());

        let failure = match outcome {
            Ok(payload) => return Ok(payload),
            Err(failure) => failure,
        };

        if !failure.error.is_retryable() || attempt >= max_attempts {
            if failure.error.is_not_found() {
                debug!("No data at {}", url);
            } else {
                error!(
                    "Request failed after {} attempt(s): {}",
                    attempt, failure.error
                );
                metrics.record_failure();
            }
            return Err(failure.error);
        }

        let wait = match failure.retry_after {
            Some(server_wait) if failure.error.is_rate_limited() => server_wait.min(retry.max_delay()),
            _ => with_jitter(backoff_delay(
                retry,
                attempt - 1,
                failure.error.is_rate_limited(),
            )),
        };
        warn!(
            "Transient failure from {}: {}. Retrying in {:?} (attempt {}/{})",
            url,
            failure.error,
            wait,
            attempt + 1,
            max_attempts
        );
        metrics.record_retry();
        tokio::time::sleep(wait).await;
    }
}

async fn send_once(
    client: &Client,
    base_url: &str,
    descriptor: &RequestDescriptor,
    url: &str,
) -> Result<Value, AttemptError> {
    let endpoint = format!("{}{}", base_url.trim_end_matches('/'), descriptor.path);
    let response = client
        .get(&endpoint)
        .query(&descriptor.params)
        .send()
        .await
        .map_err(|e| transport_error(e, url))?;

    let status = response.status();
    debug!("Response status: {status}");

    if !status.is_success() {
        let wait = retry_after(&response);
        let error = classify_status(status, url);
        return Err(AttemptError {
            error,
            retry_after: wait,
        });
    }

    let text = response.text().await.map_err(|e| transport_error(e, url))?;
    if text.trim().is_empty() {
        return Err(AppError::api_not_found(url).into());
    }
    debug!("Response length: {} bytes", text.len());

    let body: Value = serde_json::from_str(&text).map_err(|e| {
        let preview: String = text.chars().take(200).collect();
        error!("Failed to parse API response: {} (first 200 chars: {})", e, preview);
        AppError::api_malformed_json(e.to_string(), url)
    })?;

    match extract_payload(body) {
        Value::Null => Err(AppError::api_not_found(url).into()),
        payload => Ok(payload),
    }
}

/// Maps a transport failure onto the error taxonomy. Failures after the
/// connection was established (resets, truncated bodies) count as
/// connection errors so they are retried.
fn transport_error(e: reqwest::Error, url: &str) -> AppError {
    if e.is_timeout() {
        AppError::network_timeout(url)
    } else if e.is_connect() || e.is_request() || e.is_body() {
        AppError::network_connection(url, e.to_string())
    } else {
        AppError::ApiFetch(e)
    }
}

/// Maps a non-success status onto the error taxonomy.
fn classify_status(status: StatusCode, url: &str) -> AppError {
    let code = status.as_u16();
    let reason = status.canonical_reason().unwrap_or("Unknown error");
    match code {
        404 => AppError::api_not_found(url),
        429 => AppError::api_rate_limit(reason, url),
        502 | 503 => AppError::api_service_unavailable(code, reason, url),
        500..=599 => AppError::api_server_error(code, reason, url),
        _ => AppError::api_client_error(code, reason, url),
    }
}
