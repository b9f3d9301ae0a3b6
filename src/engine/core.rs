// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! owns the task registry and produces:
//! - an updated registry
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - persisting the registry
//! - handling Ctrl+C / shutdown
//!
//! Time is always passed in, so the core is unit tested without any Tokio,
//! channels, filesystem, processes, or wall clock.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::engine::event_handlers::{CoreStep, handle_task_completion, handle_tick};
use crate::engine::{ExecutionReport, TaskName};
use crate::errors::{Result, TaskdagError};
use crate::registry::{Registry, Task, TaskView};
use crate::schedule::{CustomSchedule, ScheduleCalculator};
use crate::types::{Frequency, Priority};

/// Events the core reacts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreEvent {
    /// Dispatch tick at the given instant.
    Tick { now: DateTime<Utc> },
    /// A dispatched task finished.
    TaskCompleted {
        task: TaskName,
        report: ExecutionReport,
    },
}

/// Pure core runtime state.
///
/// This owns:
/// - the task registry
/// - the set of tasks currently executing
/// - the schedule calculator
///
/// A task in the running set is never dispatched again until its completion
/// has been recorded.
#[derive(Debug)]
pub struct CoreRuntime {
    registry: Registry,
    running: HashSet<TaskName>,
    calculator: ScheduleCalculator,
    default_max_retries: u32,
}

impl CoreRuntime {
    pub fn new(registry: Registry, calculator: ScheduleCalculator, default_max_retries: u32) -> Self {
        Self {
            registry,
            running: HashSet::new(),
            calculator,
            default_max_retries,
        }
    }

    /// Replace the evaluator used for `Custom` schedules.
    pub fn set_custom_schedule(&mut self, custom: Arc<dyn CustomSchedule>) {
        self.calculator = self.calculator.clone().with_custom(custom);
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn calculator(&self) -> &ScheduleCalculator {
        &self.calculator
    }

    pub fn is_running(&self, name: &str) -> bool {
        self.running.contains(name)
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Handle a single event, updating core state and returning the resulting
    /// commands for the IO shell.
    pub fn step(&mut self, event: CoreEvent) -> CoreStep {
        match event {
            CoreEvent::Tick { now } => {
                handle_tick(&mut self.registry, &mut self.running, &self.calculator, now)
            }
            CoreEvent::TaskCompleted { task, report } => handle_task_completion(
                &mut self.registry,
                &mut self.running,
                &self.calculator,
                &task,
                report,
            ),
        }
    }

    /// Register a new `Pending`, unscheduled task.
    pub fn add_task(
        &mut self,
        name: &str,
        command: &str,
        priority: Priority,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let task = Task::new(name, command, priority, now).with_max_retries(self.default_max_retries);
        self.insert_task(task)
    }

    /// Register a fully built task record.
    pub fn insert_task(&mut self, task: Task) -> Result<()> {
        let name = task.name.clone();
        let priority = task.priority;
        self.registry.insert(task)?;
        info!(task = %name, priority = %priority, "task added");
        Ok(())
    }

    /// Assign a schedule.
    ///
    /// A changed frequency or expression gets a fresh `next_run` from `now`.
    /// Re-assigning the current schedule only advances `next_run` once it has
    /// elapsed, so repeated calls leave a pending run where it is.
    ///
    /// `custom_schedule` is stored verbatim; it is only interpreted for
    /// `Frequency::Custom`.
    pub fn set_schedule(
        &mut self,
        name: &str,
        frequency: Frequency,
        custom_schedule: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let task = self
            .registry
            .get_mut(name)
            .ok_or_else(|| TaskdagError::NotFound(name.to_string()))?;

        let next_run = if task.frequency == frequency && task.custom_schedule == custom_schedule {
            self.calculator
                .advance(frequency, custom_schedule, task.next_run, now)
        } else {
            self.calculator.initial(frequency, custom_schedule, now)
        };

        task.frequency = frequency;
        task.custom_schedule = custom_schedule.to_string();
        task.next_run = next_run;

        info!(task = %name, frequency = %frequency, next_run = ?next_run, "schedule set");
        Ok(())
    }

    pub fn add_dependency(&mut self, task: &str, depends_on: &str) -> Result<()> {
        self.registry.add_dependency(task, depends_on)?;
        info!(task = %task, depends_on = %depends_on, "dependency added");
        Ok(())
    }

    /// Snapshot of every task, ordered by name.
    pub fn list_tasks(&self) -> Vec<TaskView> {
        self.registry.views()
    }

    pub fn get_task(&self, name: &str) -> Result<TaskView> {
        self.registry
            .view(name)
            .ok_or_else(|| TaskdagError::NotFound(name.to_string()))
    }
}
