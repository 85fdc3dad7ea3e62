use super::Config;
use crate::error::AppError;
use std::path::Path;

/// Validates the configuration settings
///
/// # Validation Rules
/// - API key cannot be empty
/// - API base URL must be a valid URL or domain name
/// - Retry attempts, batch size and stage concurrency must be at least 1
/// - Lineup window lower bound must be below its upper bound
/// - If log file path is provided, it cannot be empty and its parent must be creatable
pub fn validate_config(config: &Config) -> Result<(), AppError> {
    if config.api_key.trim().is_empty() {
        return Err(AppError::config_error(
            "API key is missing (set api_key or MATCHDAY_API_KEY)",
        ));
    }

    validate_base_url(&config.api_base_url)?;

    if config.api_key_header.trim().is_empty() {
        return Err(AppError::config_error("API key header name cannot be empty"));
    }

    if config.retry.max_attempts == 0 {
        return Err(AppError::config_error("retry.max_attempts must be at least 1"));
    }

    if config.batch.size == 0 {
        return Err(AppError::config_error("batch.size must be at least 1"));
    }

    let scheduler = &config.scheduler;
    if scheduler.stage_concurrency == 0 {
        return Err(AppError::config_error(
            "scheduler.stage_concurrency must be at least 1",
        ));
    }

    if scheduler.lineup_window_min_minutes >= scheduler.lineup_window_max_minutes {
        return Err(AppError::config_error(format!(
            "Lineup window is empty: {}..{} minutes",
            scheduler.lineup_window_min_minutes, scheduler.lineup_window_max_minutes
        )));
    }

    if [
        scheduler.discovery_interval_seconds,
        scheduler.lineup_interval_seconds,
        scheduler.live_interval_seconds,
        scheduler.post_match_interval_seconds,
    ]
    .contains(&0)
    {
        return Err(AppError::config_error("Job intervals must be non-zero"));
    }

    if let Some(log_path) = &config.log_file_path {
        if log_path.is_empty() {
            return Err(AppError::config_error("Log file path cannot be empty"));
        }

        // Check if parent directory exists or can be created
        if let Some(parent) = Path::new(log_path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::config_error(format!(
                    "Cannot create log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    Ok(())
}

fn validate_base_url(api_base_url: &str) -> Result<(), AppError> {
    if api_base_url.is_empty() {
        return Err(AppError::config_error("API base URL cannot be empty"));
    }

    if !api_base_url.starts_with("http://") && !api_base_url.starts_with("https://") {
        // If it doesn't start with protocol, it should at least look like a domain
        if !api_base_url.contains('.') && !api_base_url.starts_with("localhost") {
            return Err(AppError::config_error(
                "API base URL must be a valid URL or domain name",
            ));
        }
    }

    Ok(())
}
