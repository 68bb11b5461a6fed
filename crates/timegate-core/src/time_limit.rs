//! Time-limit rules attached to token-like values
//!
//! [`TimeLimited`] owns the serialize/deserialize contract for the opaque
//! config field and the per-request check. Implementors only expose the
//! enabled flag and the raw config text; the store never interprets either.

use thiserror::Error;
use timegate_api::{AccessDecision, DenialReason, TimeLimitConfig, TokenRecord};
use timegate_config::{RuleError, validate_time_limit_config};
use timegate_util::{Clock, WallClock, weekday_code};
use tracing::debug;

use chrono::Datelike;

use crate::TimeLimitEvaluator;

/// Time-limit errors
#[derive(Debug, Error)]
pub enum TimeLimitError {
    #[error("Rule #{index} rejected: {source}")]
    InvalidRule {
        index: usize,
        #[source]
        source: RuleError,
    },

    #[error("Stored time-limit config is corrupt: {0}")]
    ConfigCorrupt(#[source] serde_json::Error),

    #[error("Failed to encode time-limit config: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Stable classification of a [`TimeLimitError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimeLimitErrorKind {
    InvalidDayOfWeek,
    InvalidTimeFormat,
    InvalidTimeRange,
    ConfigCorrupt,
    Encode,
}

impl TimeLimitError {
    pub fn kind(&self) -> TimeLimitErrorKind {
        match self {
            TimeLimitError::InvalidRule { source, .. } => match source {
                RuleError::InvalidDayOfWeek(_) => TimeLimitErrorKind::InvalidDayOfWeek,
                RuleError::InvalidTimeFormat { .. } => TimeLimitErrorKind::InvalidTimeFormat,
                RuleError::InvalidTimeRange { .. } => TimeLimitErrorKind::InvalidTimeRange,
            },
            TimeLimitError::ConfigCorrupt(_) => TimeLimitErrorKind::ConfigCorrupt,
            TimeLimitError::Encode(_) => TimeLimitErrorKind::Encode,
        }
    }
}

/// A value carrying a time-limit flag and a serialized rule set
pub trait TimeLimited {
    fn time_limit_enabled(&self) -> bool;

    fn set_time_limit_enabled(&mut self, enabled: bool);

    /// Raw serialized config, if any
    fn time_limit_config_raw(&self) -> Option<&str>;

    /// Overwrite the raw serialized config
    fn replace_time_limit_config_raw(&mut self, raw: Option<String>);

    /// Validate every rule and store the set, replacing any previous one.
    /// On error the stored config is left untouched.
    fn set_time_limit_config(&mut self, config: &TimeLimitConfig) -> Result<(), TimeLimitError> {
        validate_time_limit_config(config)
            .map_err(|(index, source)| TimeLimitError::InvalidRule { index, source })?;

        let raw = serde_json::to_string(config).map_err(TimeLimitError::Encode)?;
        self.replace_time_limit_config_raw(Some(raw));
        Ok(())
    }

    /// Decode the stored rule set. Unset or blank config reads as empty.
    fn get_time_limit_config(&self) -> Result<TimeLimitConfig, TimeLimitError> {
        match self.time_limit_config_raw().map(str::trim) {
            None | Some("") | Some("null") => Ok(TimeLimitConfig::default()),
            Some(raw) => serde_json::from_str(raw).map_err(TimeLimitError::ConfigCorrupt),
        }
    }

    /// Whether access is permitted right now
    fn check_time_limit(&self, clock: &dyn Clock) -> Result<bool, TimeLimitError> {
        self.evaluate_time_limit(clock)
            .map(|decision| decision.is_allowed())
    }

    /// Like [`check_time_limit`](Self::check_time_limit), but a refusal
    /// carries the weekday, time and next opening that led to it.
    fn evaluate_time_limit(&self, clock: &dyn Clock) -> Result<AccessDecision, TimeLimitError> {
        if !self.time_limit_enabled() {
            return Ok(AccessDecision::Allowed);
        }

        let config = self.get_time_limit_config()?;
        if config.is_empty() {
            // Enabled but unconfigured fails open
            return Ok(AccessDecision::Allowed);
        }

        let now = clock.now();
        let evaluator = TimeLimitEvaluator::new(&config);
        if evaluator.allows(&now) {
            return Ok(AccessDecision::Allowed);
        }

        let weekday = weekday_code(now.weekday());
        let time = WallClock::from_naive_time(now.time());
        debug!(weekday, time = %time, rule_count = config.len(), "No time-limit rule matched");

        Ok(AccessDecision::Denied {
            reason: DenialReason::OutsideTimeWindow {
                weekday,
                time: time.to_string(),
                next_window_start: evaluator.next_window_start(&now, clock.time_zone()),
            },
        })
    }
}

impl TimeLimited for TokenRecord {
    fn time_limit_enabled(&self) -> bool {
        self.time_limit_enabled
    }

    fn set_time_limit_enabled(&mut self, enabled: bool) {
        self.time_limit_enabled = enabled;
    }

    fn time_limit_config_raw(&self) -> Option<&str> {
        self.time_limit_config.as_deref()
    }

    fn replace_time_limit_config_raw(&mut self, raw: Option<String>) {
        self.time_limit_config = raw;
    }
}
