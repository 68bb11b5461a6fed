//! Validated service settings

use crate::schema::{RawConfig, RawServiceConfig};
use std::path::PathBuf;
use timegate_util::{TimeZoneSetting, default_data_dir};

/// Validated settings ready for use by the access guard and the CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Zone every rule is evaluated in
    pub time_zone: TimeZoneSetting,

    /// Directory holding the token database
    pub data_dir: PathBuf,

    /// Record an audit event for every time-window denial
    pub audit_denials: bool,
}

impl Settings {
    /// Convert from raw config (after validation)
    pub fn from_raw(raw: RawConfig) -> Self {
        Self::from_service(raw.service)
    }

    fn from_service(raw: RawServiceConfig) -> Self {
        let time_zone = raw
            .time_zone
            .and_then(|zone| zone.parse().ok())
            .unwrap_or_default();

        Self {
            time_zone,
            data_dir: raw.data_dir.unwrap_or_else(default_data_dir),
            audit_denials: raw.audit_denials.unwrap_or(true),
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_service(RawServiceConfig::default())
    }
}
