// src/registry/task.rs

//! The task record, its read-only view, and the dispatch description handed
//! to the executor.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{Frequency, Priority, TaskName, TaskStatus};

pub const DEFAULT_MAX_RETRIES: u32 = 3;

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

/// A named unit of work wrapping one external command.
///
/// This is also the persisted record: every field round-trips through the
/// registry document. Timestamps serialize as RFC 3339 and `dependencies` as
/// an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub name: TaskName,
    pub command: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub frequency: Frequency,
    /// Only interpreted when `frequency` is `Custom`.
    #[serde(default)]
    pub custom_schedule: String,
    /// Tasks that must be `Completed` before this one may run.
    #[serde(default)]
    pub dependencies: BTreeSet<TaskName>,
    #[serde(default)]
    pub last_run: Option<DateTime<Utc>>,
    #[serde(default)]
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    /// Last captured failure detail; empty after a success.
    #[serde(default)]
    pub error_message: String,
    #[serde(default)]
    pub retry_count: u32,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Task {
    /// A fresh `Pending` task with no schedule and no dependencies.
    pub fn new(
        name: impl Into<TaskName>,
        command: impl Into<String>,
        priority: Priority,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            priority,
            status: TaskStatus::Pending,
            frequency: Frequency::Once,
            custom_schedule: String::new(),
            dependencies: BTreeSet::new(),
            last_run: None,
            next_run: None,
            created_at,
            error_message: String::new(),
            retry_count: 0,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Retry exhaustion: the task is permanently excluded from dispatch.
    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }

    /// Whether `next_run` is set and has elapsed at `now`.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.next_run.is_some_and(|next| next <= now)
    }
}

/// Read-only snapshot of a task as reported to operators.
///
/// `status` is the *reported* status: `Blocked` is substituted for a stored
/// `Pending`/`Failed` status while any dependency is not `Completed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskView {
    pub name: TaskName,
    pub command: String,
    pub priority: Priority,
    pub status: TaskStatus,
    pub frequency: Frequency,
    pub custom_schedule: String,
    pub dependencies: Vec<TaskName>,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub error_message: String,
    pub retry_count: u32,
    pub max_retries: u32,
}

impl TaskView {
    pub fn from_task(task: &Task, deps_satisfied: bool) -> Self {
        let status = match task.status {
            TaskStatus::Pending | TaskStatus::Failed if !deps_satisfied => TaskStatus::Blocked,
            other => other,
        };

        Self {
            name: task.name.clone(),
            command: task.command.clone(),
            priority: task.priority,
            status,
            frequency: task.frequency,
            custom_schedule: task.custom_schedule.clone(),
            dependencies: task.dependencies.iter().cloned().collect(),
            last_run: task.last_run,
            next_run: task.next_run,
            created_at: task.created_at,
            error_message: task.error_message.clone(),
            retry_count: task.retry_count,
            max_retries: task.max_retries,
        }
    }

    pub fn retries_exhausted(&self) -> bool {
        self.retry_count >= self.max_retries
    }
}

/// Description of a task that the dispatch selector wants the executor to run
/// now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledTask {
    pub name: TaskName,
    pub command: String,
    pub priority: Priority,
}

impl ScheduledTask {
    pub fn from_task(task: &Task) -> Self {
        Self {
            name: task.name.clone(),
            command: task.command.clone(),
            priority: task.priority,
        }
    }
}
