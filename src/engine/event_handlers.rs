// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::engine::{ExecutionReport, TaskName, TaskOutcome};
use crate::registry::{Registry, ScheduledTask, select_ready};
use crate::schedule::ScheduleCalculator;
use crate::types::{Frequency, TaskStatus};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    /// Send these tasks to the executor, in this order.
    DispatchTasks(Vec<ScheduledTask>),
    /// The registry changed; write it to the durable store.
    Persist,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
}

impl CoreStep {
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Tasks dispatched by this step, flattened.
    pub fn dispatched(&self) -> Vec<&ScheduledTask> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                CoreCommand::DispatchTasks(tasks) => Some(tasks.iter()),
                CoreCommand::Persist => None,
            })
            .flatten()
            .collect()
    }
}

/// Handle a dispatch tick.
///
/// Ready tasks are marked `Running` and added to the running set, so later
/// ticks skip them until their completion arrives.
///
/// Recurring tasks whose retries are exhausted are never dispatched, but
/// their elapsed `next_run` is still rolled forward here.
pub fn handle_tick(
    registry: &mut Registry,
    running: &mut HashSet<TaskName>,
    calculator: &ScheduleCalculator,
    now: DateTime<Utc>,
) -> CoreStep {
    let advanced = advance_exhausted(registry, running, calculator, now);

    let ready = select_ready(registry, running, now);
    if ready.is_empty() {
        return if advanced {
            CoreStep {
                commands: vec![CoreCommand::Persist],
            }
        } else {
            CoreStep::default()
        };
    }

    for task in &ready {
        if let Some(info) = registry.get_mut(&task.name) {
            info.status = TaskStatus::Running;
        }
        running.insert(task.name.clone());
    }

    let names: Vec<_> = ready.iter().map(|t| t.name.as_str()).collect();
    info!(?names, "dispatching ready tasks");

    CoreStep {
        commands: vec![CoreCommand::Persist, CoreCommand::DispatchTasks(ready)],
    }
}

fn advance_exhausted(
    registry: &mut Registry,
    running: &HashSet<TaskName>,
    calculator: &ScheduleCalculator,
    now: DateTime<Utc>,
) -> bool {
    let mut changed = false;

    for task in registry.tasks_mut() {
        if task.frequency == Frequency::Once
            || !task.retries_exhausted()
            || !task.is_due(now)
            || running.contains(&task.name)
        {
            continue;
        }

        let next = calculator.advance(task.frequency, &task.custom_schedule, task.next_run, now);
        if next != task.next_run {
            debug!(task = %task.name, next_run = ?next, "advancing schedule of exhausted task");
            task.next_run = next;
            changed = true;
        }
    }

    changed
}

/// Handle a task completion.
///
/// Records the outcome, then computes a fresh `next_run`:
/// - success: `Completed`, error cleared, `retry_count` reset to 0
/// - failure: `Failed`, error stored, `retry_count` incremented (never past
///   `max_retries`)
///
/// In both cases `last_run` is the execution start time.
pub fn handle_task_completion(
    registry: &mut Registry,
    running: &mut HashSet<TaskName>,
    calculator: &ScheduleCalculator,
    task: &str,
    report: ExecutionReport,
) -> CoreStep {
    if !running.remove(task) {
        warn!(task = %task, "completion for task that is not running; ignoring");
        return CoreStep::default();
    }

    let Some(info) = registry.get_mut(task) else {
        warn!(task = %task, "completion for unknown task; ignoring");
        return CoreStep::default();
    };

    info.last_run = Some(report.started_at);
    let duration_ms = (report.finished_at - report.started_at).num_milliseconds();

    match report.outcome {
        TaskOutcome::Success => {
            info.status = TaskStatus::Completed;
            info.error_message.clear();
            info.retry_count = 0;
        }
        TaskOutcome::Failed { exit_code, message } => {
            info.status = TaskStatus::Failed;
            info.error_message = message;
            info.retry_count = (info.retry_count + 1).min(info.max_retries);

            if info.retries_exhausted() {
                warn!(
                    task = %info.name,
                    exit_code = ?exit_code,
                    retry_count = info.retry_count,
                    "retries exhausted; task excluded from further dispatch"
                );
            }
        }
    }

    info.next_run = calculator.after_run(info);

    debug!(
        task = %info.name,
        status = %info.status,
        retry_count = info.retry_count,
        duration_ms,
        next_run = ?info.next_run,
        "recorded task outcome"
    );

    CoreStep {
        commands: vec![CoreCommand::Persist],
    }
}
