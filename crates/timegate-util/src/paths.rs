//! Default paths for timegate
//!
//! Paths are user-writable by default (no root required):
//! - Config: `$XDG_CONFIG_HOME/timegate/config.toml` or `~/.config/timegate/config.toml`
//! - Data: `$XDG_DATA_HOME/timegate` or `~/.local/share/timegate`

use std::path::PathBuf;

/// Environment variable for overriding the data directory
pub const TIMEGATE_DATA_DIR_ENV: &str = "TIMEGATE_DATA_DIR";

/// Environment variable for overriding the config file
pub const TIMEGATE_CONFIG_ENV: &str = "TIMEGATE_CONFIG";

/// Application subdirectory name
const APP_DIR: &str = "timegate";

/// Config filename within the config directory
const CONFIG_FILENAME: &str = "config.toml";

/// Database filename within the data directory
pub const DATABASE_FILENAME: &str = "timegate.db";

/// Get the default data directory.
///
/// Order of precedence:
/// 1. `$TIMEGATE_DATA_DIR` environment variable (if set)
/// 2. `$XDG_DATA_HOME/timegate` (if XDG_DATA_HOME is set)
/// 3. `~/.local/share/timegate` (fallback)
pub fn default_data_dir() -> PathBuf {
    if let Ok(path) = std::env::var(TIMEGATE_DATA_DIR_ENV) {
        return PathBuf::from(path);
    }

    xdg_data_dir()
}

fn xdg_data_dir() -> PathBuf {
    if let Ok(data_home) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(data_home).join(APP_DIR);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".local")
            .join("share")
            .join(APP_DIR);
    }

    // Last resort
    PathBuf::from("/tmp").join(APP_DIR).join("data")
}

/// Get the default config file path.
///
/// Order of precedence:
/// 1. `$XDG_CONFIG_HOME/timegate/config.toml` (if XDG_CONFIG_HOME is set)
/// 2. `~/.config/timegate/config.toml` (fallback)
pub fn default_config_path() -> PathBuf {
    if let Ok(config_home) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(config_home).join(APP_DIR).join(CONFIG_FILENAME);
    }

    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home)
            .join(".config")
            .join(APP_DIR)
            .join(CONFIG_FILENAME);
    }

    PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILENAME)
}
