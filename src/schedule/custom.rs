// src/schedule/custom.rs

//! Extension point for `Frequency::Custom` schedules.

use std::fmt::Debug;
use std::sync::LazyLock;

use chrono::{DateTime, TimeDelta, Utc};
use regex::Regex;

use crate::types::parse_duration;

/// Interprets the opaque `custom_schedule` string of a task.
///
/// Implementations return the next run time strictly after `after`, or `None`
/// when the expression is not understood (the task then stays unscheduled).
pub trait CustomSchedule: Send + Sync + Debug {
    fn next_after(&self, expr: &str, after: DateTime<Utc>) -> Option<DateTime<Utc>>;
}

static INTERVAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(?:every\s+)?(\d+\s*(?:s|m|h|d))$").expect("interval regex is valid")
});

/// Default custom schedule: fixed intervals such as `"every 30m"`, `"6h"` or
/// `"every 2d"`.
#[derive(Debug, Clone, Copy, Default)]
pub struct IntervalSchedule;

impl IntervalSchedule {
    /// Parse an interval expression into a strictly positive interval.
    pub fn parse(expr: &str) -> Option<TimeDelta> {
        let caps = INTERVAL_RE.captures(expr.trim())?;
        let literal: String = caps[1].split_whitespace().collect();
        let dur = parse_duration(&literal).ok()?;
        if dur.is_zero() {
            return None;
        }
        TimeDelta::from_std(dur).ok()
    }
}

impl CustomSchedule for IntervalSchedule {
    fn next_after(&self, expr: &str, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let interval = Self::parse(expr)?;
        after.checked_add_signed(interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_interval_forms() {
        assert_eq!(IntervalSchedule::parse("every 30m"), Some(TimeDelta::minutes(30)));
        assert_eq!(IntervalSchedule::parse("6h"), Some(TimeDelta::hours(6)));
        assert_eq!(IntervalSchedule::parse("Every 2 d"), Some(TimeDelta::days(2)));
        assert_eq!(IntervalSchedule::parse(" 45s "), Some(TimeDelta::seconds(45)));
    }

    #[test]
    fn rejects_zero_and_unknown_expressions() {
        assert_eq!(IntervalSchedule::parse("every 0m"), None);
        assert_eq!(IntervalSchedule::parse("0 3 * * *"), None);
        assert_eq!(IntervalSchedule::parse(""), None);
    }

    #[test]
    fn next_after_is_strictly_later() {
        let now = Utc::now();
        let next = IntervalSchedule.next_after("every 1h", now).unwrap();
        assert_eq!(next - now, TimeDelta::hours(1));
    }
}
