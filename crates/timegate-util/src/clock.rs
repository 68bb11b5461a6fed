//! Injectable clocks
//!
//! Every time-sensitive check takes a [`Clock`] rather than reading the host
//! clock directly. Production code wires in [`SystemClock`]; tests use
//! [`FixedClock`] and move it around explicitly.
//!
//! # Mock Time for Development
//!
//! In debug builds, the `TIMEGATE_MOCK_TIME` environment variable can be set
//! to override the system clock. The mock instant is interpreted in the
//! clock's configured time zone and advances at real speed from there.
//!
//! Format: `YYYY-MM-DD HH:MM:SS` (e.g., `2025-12-25 14:30:00`)
//!
//! ```bash
//! TIMEGATE_MOCK_TIME="2025-12-25 14:30:00" timegate check <token-id>
//! ```

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use std::sync::{Mutex, OnceLock};

use crate::TimeZoneSetting;

/// Environment variable name for mock time (debug builds only)
pub const MOCK_TIME_ENV_VAR: &str = "TIMEGATE_MOCK_TIME";

/// Expected format of `TIMEGATE_MOCK_TIME`
pub const MOCK_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Source of "now" in the configured time zone
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Zone future wall times are placed in. Defaults to the offset of `now`.
    fn time_zone(&self) -> TimeZoneSetting {
        TimeZoneSetting::Fixed(*self.now().offset())
    }
}

/// Mock wall time paired with the real instant it was captured at.
#[derive(Debug, Clone, Copy)]
struct MockAnchor {
    wall: NaiveDateTime,
    captured_at: DateTime<Utc>,
}

static MOCK_ANCHOR: OnceLock<Option<MockAnchor>> = OnceLock::new();

#[allow(clippy::disallowed_methods)] // Captures the real instant the mock time is anchored to
fn mock_anchor() -> Option<MockAnchor> {
    *MOCK_ANCHOR.get_or_init(|| {
        #[cfg(debug_assertions)]
        {
            if let Ok(mock_time_str) = std::env::var(MOCK_TIME_ENV_VAR) {
                match NaiveDateTime::parse_from_str(&mock_time_str, MOCK_TIME_FORMAT) {
                    Ok(wall) => {
                        tracing::info!(mock_time = %mock_time_str, "Mock time enabled");
                        return Some(MockAnchor {
                            wall,
                            captured_at: Utc::now(),
                        });
                    }
                    Err(_) => {
                        tracing::warn!(
                            mock_time = %mock_time_str,
                            expected_format = MOCK_TIME_FORMAT,
                            "Invalid mock time format"
                        );
                    }
                }
            }
            None
        }
        #[cfg(not(debug_assertions))]
        {
            None
        }
    })
}

/// Returns whether mock time is currently active.
pub fn is_mock_time_active() -> bool {
    mock_anchor().is_some()
}

/// Host clock read in a configured time zone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock {
    zone: TimeZoneSetting,
}

impl SystemClock {
    pub fn new(zone: TimeZoneSetting) -> Self {
        Self { zone }
    }

    pub fn zone(&self) -> TimeZoneSetting {
        self.zone
    }
}

impl Clock for SystemClock {
    #[allow(clippy::disallowed_methods)] // This is the wrapper that provides mock time support
    fn now(&self) -> DateTime<FixedOffset> {
        let real_now = Utc::now();

        if let Some(anchor) = mock_anchor()
            && let Some(mock_start) = self.zone.localize(&anchor.wall)
        {
            return mock_start + real_now.signed_duration_since(anchor.captured_at);
        }

        self.zone.convert(real_now)
    }

    fn time_zone(&self) -> TimeZoneSetting {
        self.zone
    }
}

/// Clock pinned to an explicit instant, for tests and replay
#[derive(Debug)]
pub struct FixedClock {
    instant: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(instant: DateTime<FixedOffset>) -> Self {
        Self {
            instant: Mutex::new(instant),
        }
    }

    /// Move the clock to a new instant
    pub fn set(&self, instant: DateTime<FixedOffset>) {
        *self.instant.lock().unwrap_or_else(|e| e.into_inner()) = instant;
    }

    /// Move the clock forward (or backward, for negative durations)
    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.instant.lock().unwrap_or_else(|e| e.into_inner());
        *guard = *guard + by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.instant.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl<C: Clock + ?Sized> Clock for std::sync::Arc<C> {
    fn now(&self) -> DateTime<FixedOffset> {
        (**self).now()
    }

    fn time_zone(&self) -> TimeZoneSetting {
        (**self).time_zone()
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> DateTime<FixedOffset> {
        (**self).now()
    }

    fn time_zone(&self) -> TimeZoneSetting {
        (**self).time_zone()
    }
}
