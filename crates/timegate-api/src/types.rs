//! Time-limit rule model and token record

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use timegate_util::{EVERY_DAY, TokenId};

/// One weekly recurring interval during which a token may be used.
///
/// Persisted as `{ "dayOfWeek": int, "startTime": "HH:MM", "endTime": "HH:MM" }`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeLimitRule {
    /// `-1` for every day, otherwise `0` (Sunday) through `6` (Saturday)
    pub day_of_week: i32,

    /// Inclusive start, `HH:MM`
    pub start_time: String,

    /// Inclusive end, `HH:MM`
    pub end_time: String,
}

impl TimeLimitRule {
    pub fn new(day_of_week: i32, start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self {
            day_of_week,
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    /// Rule that applies on every day of the week
    pub fn every_day(start_time: impl Into<String>, end_time: impl Into<String>) -> Self {
        Self::new(EVERY_DAY, start_time, end_time)
    }
}

/// Rule set attached to a token. Any matching rule grants access.
///
/// Persisted as `{ "rules": [...] }`. Unknown fields are ignored and a
/// missing `rules` key reads as an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeLimitConfig {
    #[serde(default)]
    pub rules: Vec<TimeLimitRule>,
}

impl TimeLimitConfig {
    pub fn new(rules: Vec<TimeLimitRule>) -> Self {
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }
}

impl FromIterator<TimeLimitRule> for TimeLimitConfig {
    fn from_iter<I: IntoIterator<Item = TimeLimitRule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

/// Token fields relevant to time-limited access, as held by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub id: TokenId,

    /// Display name
    pub name: String,

    /// When false, time-limit rules are bypassed entirely
    #[serde(default)]
    pub time_limit_enabled: bool,

    /// Serialized `TimeLimitConfig`. Written and read only through the
    /// evaluator, never interpreted by the store.
    #[serde(default)]
    pub time_limit_config: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(id: TokenId, name: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            time_limit_enabled: false,
            time_limit_config: None,
            created_at,
        }
    }
}
