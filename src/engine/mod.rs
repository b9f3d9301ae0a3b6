// src/engine/mod.rs

//! Orchestration engine for taskdag.
//!
//! This module ties together:
//! - the task registry and schedule calculator
//! - the dispatch tick (which ready tasks to launch, in which order)
//! - execution outcomes flowing back from workers
//! - operator requests and shutdown
//!
//! The pure core state machine lives in [`core`] (with the per-event logic in
//! [`event_handlers`]); [`scheduler`] adds persistence on top of it; the async
//! IO shell is implemented in [`runtime`] and driven through [`handle`].

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::errors::Result;
use crate::registry::TaskView;
use crate::types::{Frequency, Priority};

pub use crate::types::TaskName;

/// Outcome of one task execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    /// Non-zero exit, timeout or launch failure. `exit_code` is `None` when
    /// the process never produced one.
    Failed {
        exit_code: Option<i32>,
        message: String,
    },
}

impl TaskOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, TaskOutcome::Success)
    }

    /// Diagnostic text for failures.
    pub fn message(&self) -> Option<&str> {
        match self {
            TaskOutcome::Success => None,
            TaskOutcome::Failed { message, .. } => Some(message),
        }
    }
}

/// What a worker reports back after running a task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: TaskOutcome,
}

/// Scheduler tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Sleep between dispatch ticks.
    pub poll_interval: Duration,
    /// Per-execution timeout.
    pub command_timeout: Duration,
    /// Delay before a `Once` task first fires, and between its retries.
    pub once_delay: Duration,
    /// `max_retries` given to newly added tasks.
    pub max_retries: u32,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            command_timeout: Duration::from_secs(60 * 60),
            once_delay: Duration::from_secs(60),
            max_retries: crate::registry::task::DEFAULT_MAX_RETRIES,
        }
    }
}

/// Operator requests served by a running [`Runtime`].
#[derive(Debug)]
pub enum OperatorRequest {
    AddTask {
        name: TaskName,
        command: String,
        priority: Priority,
        reply: oneshot::Sender<Result<()>>,
    },
    SetSchedule {
        name: TaskName,
        frequency: Frequency,
        custom_schedule: String,
        reply: oneshot::Sender<Result<()>>,
    },
    AddDependency {
        task: TaskName,
        depends_on: TaskName,
        reply: oneshot::Sender<Result<()>>,
    },
    ListTasks {
        reply: oneshot::Sender<Vec<TaskView>>,
    },
    GetTask {
        name: TaskName,
        reply: oneshot::Sender<Result<TaskView>>,
    },
}

/// Events flowing into the runtime from workers and operators.
#[derive(Debug)]
pub enum RuntimeEvent {
    /// A worker finished executing a task.
    TaskCompleted {
        task: TaskName,
        report: ExecutionReport,
    },
    /// An operator request arriving through a [`SchedulerHandle`].
    Request(OperatorRequest),
}

pub mod core;
pub mod event_handlers;
pub mod handle;
pub mod runtime;
pub mod scheduler;

pub use self::core::{CoreEvent, CoreRuntime};
pub use event_handlers::{CoreCommand, CoreStep};
pub use handle::SchedulerHandle;
pub use runtime::Runtime;
pub use scheduler::TaskScheduler;
