//! Time-window evaluation

use chrono::{DateTime, Datelike, Days, FixedOffset, Local, TimeZone, Timelike};
use std::time::Duration;
use timegate_api::TimeLimitConfig;
use timegate_config::{ParsedRule, parse_rule};
use timegate_util::{TimeZoneSetting, WallClock};
use tracing::warn;

/// Decoded rule set, ready to answer "does this instant match any rule".
///
/// Rules are inclusive at both ends with minute precision: a `09:00-17:00`
/// rule admits 17:00:59 but not 17:01.
#[derive(Debug, Clone, Default)]
pub struct TimeLimitEvaluator {
    rules: Vec<ParsedRule>,
}

impl TimeLimitEvaluator {
    /// Decode a rule set. Rules that fail validation (written without going
    /// through the set operation) never match and are logged.
    pub fn new(config: &TimeLimitConfig) -> Self {
        let rules = config
            .rules
            .iter()
            .enumerate()
            .filter_map(|(index, rule)| match parse_rule(rule) {
                Ok(parsed) => Some(parsed),
                Err(e) => {
                    warn!(index, error = %e, "Skipping malformed stored time-limit rule");
                    None
                }
            })
            .collect();

        Self { rules }
    }

    pub fn rules(&self) -> &[ParsedRule] {
        &self.rules
    }

    /// True when any rule covers `now`. An evaluator without rules allows
    /// nothing; the fail-open case is handled by the caller.
    pub fn allows(&self, now: &DateTime<FixedOffset>) -> bool {
        let weekday = now.weekday();
        let time = WallClock::from_naive_time(now.time());
        self.rules.iter().any(|rule| rule_matches(rule, weekday, time))
    }

    /// Longest time left among the rules covering `now`
    pub fn remaining_in_window(&self, now: &DateTime<FixedOffset>) -> Option<Duration> {
        let weekday = now.weekday();
        let time = WallClock::from_naive_time(now.time());
        let now_secs = now.time().num_seconds_from_midnight();

        self.rules
            .iter()
            .filter(|rule| rule_matches(rule, weekday, time))
            .map(|rule| {
                // End minute is inclusive
                let end_secs = rule.end.as_seconds_from_midnight() + 60;
                Duration::from_secs(end_secs.saturating_sub(now_secs) as u64)
            })
            .max()
    }

    /// Earliest rule opening strictly after `now`, looking one week ahead.
    /// Each candidate day is placed in `zone`, so openings past a DST change
    /// carry that day's offset.
    pub fn next_window_start(
        &self,
        now: &DateTime<FixedOffset>,
        zone: TimeZoneSetting,
    ) -> Option<DateTime<FixedOffset>> {
        match zone {
            TimeZoneSetting::Local => self.next_window_start_in(now, &Local),
            TimeZoneSetting::Fixed(offset) => self.next_window_start_in(now, &offset),
        }
    }

    /// [`next_window_start`](Self::next_window_start) for any chrono zone.
    /// Openings that fall in a skipped local hour are passed over.
    pub fn next_window_start_in<Tz: TimeZone>(
        &self,
        now: &DateTime<FixedOffset>,
        zone: &Tz,
    ) -> Option<DateTime<FixedOffset>> {
        let today = now.date_naive();

        for days_ahead in 0..=7 {
            let date = today.checked_add_days(Days::new(days_ahead))?;
            let weekday = date.weekday();

            let earliest = self
                .rules
                .iter()
                .filter(|rule| rule.day.contains(weekday))
                .filter_map(|rule| {
                    zone.from_local_datetime(&date.and_time(rule.start.to_naive_time()))
                        .earliest()
                })
                .map(|start| start.fixed_offset())
                .filter(|start| start > now)
                .min();

            if earliest.is_some() {
                return earliest;
            }
        }

        None
    }
}

fn rule_matches(rule: &ParsedRule, weekday: chrono::Weekday, time: WallClock) -> bool {
    rule.day.contains(weekday) && rule.start <= time && time <= rule.end
}
