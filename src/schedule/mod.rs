// src/schedule/mod.rs

//! Schedule calculator: turns a task's frequency and run history into its next
//! eligible run time.
//!
//! Policy per frequency:
//! - `Once`: `now + once_delay`. After a successful run (or once retries are
//!   exhausted) the task gets no further `next_run`; a failed run with retries
//!   left is retried after `once_delay`.
//! - `Daily` / `Weekly` / `Monthly`: `now + 1d / 7d / 30d`, advanced only once
//!   the previous `next_run` has elapsed.
//! - `Custom`: delegated to a [`CustomSchedule`] implementation.

pub mod custom;

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::warn;

use crate::registry::Task;
use crate::types::{Frequency, TaskStatus};

pub use custom::{CustomSchedule, IntervalSchedule};

/// Smallest gap between a run and the `next_run` it produces.
const MIN_RECURRENCE_GAP: TimeDelta = TimeDelta::seconds(1);

#[derive(Debug, Clone)]
pub struct ScheduleCalculator {
    once_delay: TimeDelta,
    custom: Arc<dyn CustomSchedule>,
}

impl Default for ScheduleCalculator {
    fn default() -> Self {
        Self::new(Duration::from_secs(60))
    }
}

impl ScheduleCalculator {
    pub fn new(once_delay: Duration) -> Self {
        Self {
            once_delay: TimeDelta::from_std(once_delay).unwrap_or(TimeDelta::MAX),
            custom: Arc::new(IntervalSchedule),
        }
    }

    /// Replace the interpreter for `Frequency::Custom` schedules.
    pub fn with_custom(mut self, custom: Arc<dyn CustomSchedule>) -> Self {
        self.custom = custom;
        self
    }

    /// Fixed recurrence period, for the frequencies that have one.
    pub fn period(frequency: Frequency) -> Option<TimeDelta> {
        match frequency {
            Frequency::Daily => Some(TimeDelta::days(1)),
            Frequency::Weekly => Some(TimeDelta::days(7)),
            Frequency::Monthly => Some(TimeDelta::days(30)),
            Frequency::Once | Frequency::Custom => None,
        }
    }

    /// Compute a fresh `next_run` from `now`, ignoring any previous value.
    ///
    /// Used when a schedule is first assigned or changed.
    pub fn initial(
        &self,
        frequency: Frequency,
        custom_schedule: &str,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        let next = match frequency {
            Frequency::Once => now.checked_add_signed(self.once_delay),
            Frequency::Daily | Frequency::Weekly | Frequency::Monthly => {
                Self::period(frequency).and_then(|p| now.checked_add_signed(p))
            }
            Frequency::Custom => self.custom.next_after(custom_schedule, now),
        };

        if next.is_none() {
            warn!(
                frequency = %frequency,
                custom_schedule = %custom_schedule,
                "could not compute next run; task stays unscheduled"
            );
        }
        next
    }

    /// Advance `previous` only if it has elapsed at `now`.
    ///
    /// Repeated calls before `previous` is reached return it unchanged.
    pub fn advance(
        &self,
        frequency: Frequency,
        custom_schedule: &str,
        previous: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Option<DateTime<Utc>> {
        match previous {
            Some(prev) if prev > now => Some(prev),
            _ => self.initial(frequency, custom_schedule, now),
        }
    }

    /// Compute `next_run` for a task whose execution outcome (`status`,
    /// `retry_count`, `last_run`) has just been recorded.
    ///
    /// The result is always strictly later than `last_run`.
    pub fn after_run(&self, task: &Task) -> Option<DateTime<Utc>> {
        let Some(base) = task.last_run else {
            return task.next_run;
        };

        if task.frequency == Frequency::Once
            && (task.status == TaskStatus::Completed || task.retries_exhausted())
        {
            return None;
        }

        self.advance(task.frequency, &task.custom_schedule, task.next_run, base)
            .map(|next| {
                if next > base {
                    next
                } else {
                    base + MIN_RECURRENCE_GAP
                }
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;

    fn calc() -> ScheduleCalculator {
        ScheduleCalculator::new(Duration::from_secs(60))
    }

    fn ran(frequency: Frequency, status: TaskStatus, at: DateTime<Utc>) -> Task {
        let mut task = Task::new("t", "true", Priority::Medium, at - TimeDelta::days(1));
        task.frequency = frequency;
        task.status = status;
        task.next_run = Some(at);
        task.last_run = Some(at);
        task
    }

    #[test]
    fn initial_uses_fixed_periods() {
        let now = Utc::now();
        let c = calc();
        assert_eq!(c.initial(Frequency::Once, "", now), Some(now + TimeDelta::minutes(1)));
        assert_eq!(c.initial(Frequency::Daily, "", now), Some(now + TimeDelta::days(1)));
        assert_eq!(c.initial(Frequency::Weekly, "", now), Some(now + TimeDelta::days(7)));
        assert_eq!(c.initial(Frequency::Monthly, "", now), Some(now + TimeDelta::days(30)));
        assert_eq!(c.initial(Frequency::Custom, "every 2h", now), Some(now + TimeDelta::hours(2)));
        assert_eq!(c.initial(Frequency::Custom, "@reboot", now), None);
    }

    #[test]
    fn daily_advance_is_idempotent_until_elapsed() {
        let t = Utc::now();
        let c = calc();
        let next = Some(t + TimeDelta::days(1));

        assert_eq!(c.advance(Frequency::Daily, "", next, t + TimeDelta::hours(1)), next);
        assert_eq!(c.advance(Frequency::Daily, "", next, t + TimeDelta::hours(23)), next);

        let later = t + TimeDelta::days(1) + TimeDelta::minutes(5);
        assert_eq!(
            c.advance(Frequency::Daily, "", next, later),
            Some(later + TimeDelta::days(1))
        );
    }

    #[test]
    fn daily_after_run_is_one_day_after_start() {
        let t = Utc::now();
        for status in [TaskStatus::Completed, TaskStatus::Failed] {
            let task = ran(Frequency::Daily, status, t);
            assert_eq!(calc().after_run(&task), Some(t + TimeDelta::days(1)));
        }
    }

    #[test]
    fn once_stops_after_success() {
        let t = Utc::now();
        let task = ran(Frequency::Once, TaskStatus::Completed, t);
        assert_eq!(calc().after_run(&task), None);
    }

    #[test]
    fn once_retries_after_failure_until_exhausted() {
        let t = Utc::now();
        let mut task = ran(Frequency::Once, TaskStatus::Failed, t);
        task.retry_count = 1;
        assert_eq!(calc().after_run(&task), Some(t + TimeDelta::minutes(1)));

        task.retry_count = task.max_retries;
        assert_eq!(calc().after_run(&task), None);
    }

    #[test]
    fn after_run_is_strictly_later_even_with_zero_delay() {
        let t = Utc::now();
        let mut task = ran(Frequency::Once, TaskStatus::Failed, t);
        task.retry_count = 1;
        let next = ScheduleCalculator::new(Duration::ZERO).after_run(&task).unwrap();
        assert!(next > t);
    }

    #[test]
    fn custom_interpreter_can_be_replaced() {
        #[derive(Debug)]
        struct Hourly;
        impl CustomSchedule for Hourly {
            fn next_after(&self, _expr: &str, after: DateTime<Utc>) -> Option<DateTime<Utc>> {
                Some(after + TimeDelta::hours(1))
            }
        }

        let now = Utc::now();
        let c = calc().with_custom(Arc::new(Hourly));
        assert_eq!(
            c.initial(Frequency::Custom, "0 * * * *", now),
            Some(now + TimeDelta::hours(1))
        );
    }
}
