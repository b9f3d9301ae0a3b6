// src/registry/dispatch.rs

//! Dispatch selection: which tasks are ready on this tick, and in what order.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::trace;

use crate::registry::Registry;
use crate::registry::task::{ScheduledTask, Task};
use crate::types::TaskName;

/// Select the tasks that are ready at `now`, ordered for dispatch.
///
/// A task is ready when:
/// - its `next_run` is set and has elapsed,
/// - every dependency is `Completed`,
/// - it has not exhausted its retries,
/// - it is not already in the `running` set.
///
/// Ready tasks are ordered by priority (high first); equal priorities fall
/// back to creation time, then name.
pub fn select_ready(
    registry: &Registry,
    running: &HashSet<TaskName>,
    now: DateTime<Utc>,
) -> Vec<ScheduledTask> {
    let mut ready: Vec<&Task> = registry
        .tasks()
        .filter(|task| is_ready(registry, running, task, now))
        .collect();

    ready.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.name.cmp(&b.name))
    });

    ready.into_iter().map(ScheduledTask::from_task).collect()
}

fn is_ready(
    registry: &Registry,
    running: &HashSet<TaskName>,
    task: &Task,
    now: DateTime<Utc>,
) -> bool {
    if !task.is_due(now) {
        return false;
    }
    if running.contains(&task.name) {
        trace!(task = %task.name, "already running; skipping");
        return false;
    }
    if task.retries_exhausted() {
        trace!(
            task = %task.name,
            retry_count = task.retry_count,
            max_retries = task.max_retries,
            "retries exhausted; skipping"
        );
        return false;
    }
    if !registry.deps_satisfied(task) {
        trace!(task = %task.name, "dependencies not completed; blocked");
        return false;
    }
    true
}
