//! Raw configuration schema (as parsed from TOML)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw configuration as parsed from TOML
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawConfig {
    /// Config schema version
    pub config_version: u32,

    /// Service-level settings
    #[serde(default)]
    pub service: RawServiceConfig,
}

/// Service-level settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawServiceConfig {
    /// Zone rules are evaluated in: "local", "UTC", or "+HH:MM" (default: local)
    pub time_zone: Option<String>,

    /// Data directory for the token database
    pub data_dir: Option<PathBuf>,

    /// Record an audit event for every time-window denial (default: true)
    pub audit_denials: Option<bool>,
}
