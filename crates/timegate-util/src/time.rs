//! Wall-clock time utilities for timegate
//!
//! Time-limit rules are expressed in wall-clock terms: a weekday code and an
//! `HH:MM` time of day, both read in a single configured time zone.
//!
//! # Weekday codes
//!
//! Rules carry an integer weekday code. `0` is Sunday through `6` for
//! Saturday, and `-1` means "every day". [`weekday_code`] and [`RuleDay`] are
//! the only conversions between chrono's `Weekday` and these codes, so
//! validation and evaluation always agree on the numbering.

use chrono::{DateTime, FixedOffset, Local, NaiveTime, Offset, TimeZone, Timelike, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Weekday code meaning "applies every day"
pub const EVERY_DAY: i32 = -1;

/// Convert a chrono weekday into its rule code (Sunday = 0 ... Saturday = 6)
pub fn weekday_code(weekday: Weekday) -> i32 {
    weekday.num_days_from_sunday() as i32
}

/// Day selector of a rule, decoded from its weekday code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleDay {
    Every,
    On(Weekday),
}

impl RuleDay {
    /// Decode a weekday code. Returns `None` for codes outside `-1..=6`.
    pub fn from_code(code: i32) -> Option<Self> {
        let weekday = match code {
            EVERY_DAY => return Some(RuleDay::Every),
            0 => Weekday::Sun,
            1 => Weekday::Mon,
            2 => Weekday::Tue,
            3 => Weekday::Wed,
            4 => Weekday::Thu,
            5 => Weekday::Fri,
            6 => Weekday::Sat,
            _ => return None,
        };
        Some(RuleDay::On(weekday))
    }

    pub fn code(&self) -> i32 {
        match self {
            RuleDay::Every => EVERY_DAY,
            RuleDay::On(weekday) => weekday_code(*weekday),
        }
    }

    pub fn contains(&self, weekday: Weekday) -> bool {
        match self {
            RuleDay::Every => true,
            RuleDay::On(day) => *day == weekday,
        }
    }
}

/// Wall-clock time of day with minute precision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallClock {
    pub hour: u8,
    pub minute: u8,
}

impl WallClock {
    pub const MIDNIGHT: WallClock = WallClock { hour: 0, minute: 0 };

    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self { hour, minute })
        } else {
            None
        }
    }

    pub fn to_naive_time(self) -> NaiveTime {
        NaiveTime::from_hms_opt(self.hour as u32, self.minute as u32, 0).unwrap_or_default()
    }

    /// Truncates seconds, so 17:00:59 is still 17:00.
    pub fn from_naive_time(time: NaiveTime) -> Self {
        Self {
            hour: time.hour() as u8,
            minute: time.minute() as u8,
        }
    }

    /// Returns minutes since midnight
    pub fn as_minutes_from_midnight(&self) -> u32 {
        (self.hour as u32) * 60 + (self.minute as u32)
    }

    /// Returns seconds since midnight
    pub fn as_seconds_from_midnight(&self) -> u32 {
        self.as_minutes_from_midnight() * 60
    }
}

impl PartialOrd for WallClock {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for WallClock {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.as_minutes_from_midnight()
            .cmp(&other.as_minutes_from_midnight())
    }
}

impl fmt::Display for WallClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// The single time zone in which rules are evaluated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZoneSetting {
    /// The host's local zone, re-read on every call
    #[default]
    Local,
    /// A fixed UTC offset
    Fixed(FixedOffset),
}

impl TimeZoneSetting {
    pub fn utc() -> Self {
        TimeZoneSetting::Fixed(Utc.fix())
    }

    /// Express a UTC instant in this zone
    pub fn convert(&self, instant: DateTime<Utc>) -> DateTime<FixedOffset> {
        match self {
            TimeZoneSetting::Local => instant.with_timezone(&Local).fixed_offset(),
            TimeZoneSetting::Fixed(offset) => instant.with_timezone(offset),
        }
    }

    /// Interpret a naive local date-time in this zone.
    /// Returns `None` for wall times skipped by a DST transition.
    pub fn localize(&self, naive: &chrono::NaiveDateTime) -> Option<DateTime<FixedOffset>> {
        match self {
            TimeZoneSetting::Local => Local
                .from_local_datetime(naive)
                .earliest()
                .map(|dt| dt.fixed_offset()),
            TimeZoneSetting::Fixed(offset) => offset.from_local_datetime(naive).single(),
        }
    }
}

impl fmt::Display for TimeZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeZoneSetting::Local => write!(f, "local"),
            TimeZoneSetting::Fixed(offset) if offset.local_minus_utc() == 0 => write!(f, "UTC"),
            TimeZoneSetting::Fixed(offset) => write!(f, "{}", offset),
        }
    }
}

impl FromStr for TimeZoneSetting {
    type Err = String;

    /// Accepts `local`, `UTC`/`Z`, or a `+HH:MM`/`-HH:MM` offset.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "local" => return Ok(TimeZoneSetting::Local),
            "utc" | "z" => return Ok(TimeZoneSetting::utc()),
            _ => {}
        }

        let (sign, rest) = match trimmed.as_bytes().first() {
            Some(b'+') => (1, &trimmed[1..]),
            Some(b'-') => (-1, &trimmed[1..]),
            _ => return Err(format!("Unknown time zone '{}'", trimmed)),
        };

        let (hours, minutes) = rest
            .split_once(':')
            .ok_or_else(|| format!("Expected +HH:MM offset, got '{}'", trimmed))?;
        let hours = two_digits(hours)
            .ok_or_else(|| format!("Invalid offset hours in '{}'", trimmed))?;
        let minutes = two_digits(minutes)
            .filter(|m| *m < 60)
            .ok_or_else(|| format!("Invalid offset minutes in '{}'", trimmed))?;

        FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
            .map(TimeZoneSetting::Fixed)
            .ok_or_else(|| format!("Offset out of range: '{}'", trimmed))
    }
}

/// Exactly two ASCII digits, no sign
fn two_digits(s: &str) -> Option<i32> {
    match s.as_bytes() {
        [a, b] if a.is_ascii_digit() && b.is_ascii_digit() => {
            Some(i32::from(a - b'0') * 10 + i32::from(b - b'0'))
        }
        _ => None,
    }
}

/// Format a DateTime with full date, time and offset.
pub fn format_datetime_full<Tz: TimeZone>(dt: &DateTime<Tz>) -> String
where
    Tz::Offset: fmt::Display,
{
    dt.format("%Y-%m-%d %H:%M:%S %:z").to_string()
}

/// Helper to format durations in human-readable form
pub fn format_duration(d: Duration) -> String {
    let total_secs = d.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{}s", seconds)
    }
}
