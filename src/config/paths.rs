use crate::constants::cache_store;
use std::path::{Path, PathBuf};

fn app_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| Path::new(".").to_path_buf())
        .join("matchday_sync")
}

/// Returns the platform-specific path for the config file.
///
/// # Notes
/// - Uses platform-specific config directory (e.g., ~/.config on Linux)
/// - Falls back to current directory if config directory is unavailable
pub fn get_config_path() -> String {
    app_config_dir()
        .join("config.toml")
        .to_string_lossy()
        .to_string()
}

/// Returns the platform-specific path for the log directory.
pub fn get_log_dir_path() -> String {
    app_config_dir().join("logs").to_string_lossy().to_string()
}

/// Returns the default location of the durable API cache document.
pub fn get_cache_file_path() -> String {
    dirs::cache_dir()
        .map(|dir| dir.join("matchday_sync"))
        .unwrap_or_else(app_config_dir)
        .join(cache_store::FILE_NAME)
        .to_string_lossy()
        .to_string()
}
