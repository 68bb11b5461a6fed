//! Access decisions

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Outcome of a time-window check for one access attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Allowed,
    Denied { reason: DenialReason },
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    pub fn denial(&self) -> Option<&DenialReason> {
        match self {
            AccessDecision::Allowed => None,
            AccessDecision::Denied { reason } => Some(reason),
        }
    }
}

/// Why a valid token was refused.
///
/// Kept apart from authentication failures so callers can report "token
/// valid but outside permitted time window" instead of "invalid token".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum DenialReason {
    /// No rule covers the instant of the attempt
    OutsideTimeWindow {
        /// Weekday code of the attempt (0 = Sunday)
        weekday: i32,
        /// Time of day of the attempt, `HH:MM`
        time: String,
        /// When the next rule opens, if one does within a week
        next_window_start: Option<DateTime<FixedOffset>>,
    },
}

impl DenialReason {
    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            DenialReason::OutsideTimeWindow { .. } => "outside_time_window",
        }
    }

    /// Stable human-readable message
    pub fn message(&self) -> &'static str {
        match self {
            DenialReason::OutsideTimeWindow { .. } => {
                "token is valid but outside its permitted time window"
            }
        }
    }
}
