//! Rule and configuration validation

use crate::schema::RawConfig;
use thiserror::Error;
use timegate_api::{TimeLimitConfig, TimeLimitRule};
use timegate_util::{RuleDay, TimeZoneSetting, WallClock};

/// Why a single time-limit rule is malformed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    #[error("Invalid day of week {0}: expected -1 (every day) or 0-6 (Sunday-Saturday)")]
    InvalidDayOfWeek(i32),

    #[error("Invalid time format '{value}': {message}")]
    InvalidTimeFormat { value: String, message: String },

    #[error("Invalid time range: start {start} must be before end {end}")]
    InvalidTimeRange { start: String, end: String },
}

/// A rule that passed validation, decoded for evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRule {
    pub day: RuleDay,
    pub start: WallClock,
    pub end: WallClock,
}

/// Validate one rule. Checks run in order and stop at the first failure:
/// weekday code, then both time strings, then start-before-end.
pub fn validate_time_limit_rule(rule: &TimeLimitRule) -> Result<(), RuleError> {
    parse_rule(rule).map(|_| ())
}

/// Validate and decode one rule
pub fn parse_rule(rule: &TimeLimitRule) -> Result<ParsedRule, RuleError> {
    let day = RuleDay::from_code(rule.day_of_week)
        .ok_or(RuleError::InvalidDayOfWeek(rule.day_of_week))?;

    let start = parse_time(&rule.start_time).map_err(|message| RuleError::InvalidTimeFormat {
        value: rule.start_time.clone(),
        message,
    })?;
    let end = parse_time(&rule.end_time).map_err(|message| RuleError::InvalidTimeFormat {
        value: rule.end_time.clone(),
        message,
    })?;

    // Same-day intervals only; 22:00-02:00 is rejected
    if start >= end {
        return Err(RuleError::InvalidTimeRange {
            start: rule.start_time.clone(),
            end: rule.end_time.clone(),
        });
    }

    Ok(ParsedRule { day, start, end })
}

/// Validate every rule of a set, returning the index and error of the
/// first bad rule.
pub fn validate_time_limit_config(config: &TimeLimitConfig) -> Result<(), (usize, RuleError)> {
    for (index, rule) in config.rules.iter().enumerate() {
        validate_time_limit_rule(rule).map_err(|e| (index, e))?;
    }
    Ok(())
}

/// Parse strict two-digit `HH:MM` time format
pub fn parse_time(s: &str) -> Result<WallClock, String> {
    let (hour, minute) = s
        .split_once(':')
        .ok_or_else(|| "Expected HH:MM format".to_string())?;

    let is_two_digits = |part: &str| part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
    if !is_two_digits(hour) || !is_two_digits(minute) {
        return Err("Expected HH:MM format".into());
    }

    let hour: u8 = hour.parse().map_err(|_| "Invalid hour".to_string())?;
    let minute: u8 = minute.parse().map_err(|_| "Invalid minute".to_string())?;

    if hour >= 24 {
        return Err("Hour must be 00-23".into());
    }
    if minute >= 60 {
        return Err("Minute must be 00-59".into());
    }

    WallClock::new(hour, minute).ok_or_else(|| "Invalid time".to_string())
}

/// Service configuration validation error
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Invalid time zone '{value}': {message}")]
    InvalidTimeZone { value: String, message: String },

    #[error("Service config error: {0}")]
    ServiceError(String),
}

/// Validate a raw service configuration
pub fn validate_config(config: &RawConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    if let Some(zone) = &config.service.time_zone
        && let Err(message) = zone.parse::<TimeZoneSetting>()
    {
        errors.push(ValidationError::InvalidTimeZone {
            value: zone.clone(),
            message,
        });
    }

    if let Some(data_dir) = &config.service.data_dir
        && data_dir.as_os_str().is_empty()
    {
        errors.push(ValidationError::ServiceError(
            "data_dir cannot be empty".into(),
        ));
    }

    errors
}
