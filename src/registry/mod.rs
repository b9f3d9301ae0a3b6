// src/registry/mod.rs

//! Task registry: the single source of truth for all tasks.
//!
//! - [`task`] holds the `Task` record, its read-only `TaskView`, and the
//!   `ScheduledTask` handed to executors.
//! - [`graph`] contains the dependency-graph checks (cycle detection,
//!   topological order).
//! - [`dispatch`] selects and orders ready tasks for a tick.
//!
//! The registry itself performs validated mutations only; it never does IO.
//! Persisting after each mutation is the caller's job (see
//! [`crate::engine::TaskScheduler`]).

pub mod dispatch;
pub mod graph;
pub mod task;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{Result, TaskdagError};
use crate::types::{TaskName, TaskStatus};

pub use dispatch::select_ready;
pub use task::{ScheduledTask, Task, TaskView};

/// In-memory map of task name -> task record.
///
/// Serializes as a plain JSON object keyed by task name, which is exactly the
/// persisted registry document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Registry {
    tasks: BTreeMap<TaskName, Task>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.tasks.get(name)
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Option<&mut Task> {
        self.tasks.get_mut(name)
    }

    /// All tasks, ordered by name.
    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub(crate) fn tasks_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.values_mut()
    }

    pub fn task_names(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(|s| s.as_str())
    }

    /// Insert a new task. Names are unique; an existing name is rejected and
    /// the registry is left unchanged.
    pub fn insert(&mut self, task: Task) -> Result<()> {
        if self.tasks.contains_key(&task.name) {
            debug!(task = %task.name, "rejecting duplicate task name");
            return Err(TaskdagError::AlreadyExists(task.name));
        }
        self.tasks.insert(task.name.clone(), task);
        Ok(())
    }

    /// Add the edge `task -> depends_on` after validating it.
    ///
    /// Checks, in order: both tasks exist, no self-dependency, no cycle. On
    /// any rejection the registry is unchanged.
    pub fn add_dependency(&mut self, task: &str, depends_on: &str) -> Result<()> {
        for name in [task, depends_on] {
            if !self.tasks.contains_key(name) {
                debug!(task = %name, "dependency edge references unknown task");
                return Err(TaskdagError::NotFound(name.to_string()));
            }
        }

        if task == depends_on {
            debug!(task = %task, "rejecting self-dependency");
            return Err(TaskdagError::SelfDependency(task.to_string()));
        }

        if graph::would_create_cycle(&self.tasks, task, depends_on) {
            debug!(task = %task, depends_on = %depends_on, "rejecting edge that would create a cycle");
            return Err(TaskdagError::WouldCreateCycle {
                task: task.to_string(),
                depends_on: depends_on.to_string(),
            });
        }

        if let Some(info) = self.tasks.get_mut(task) {
            info.dependencies.insert(depends_on.to_string());
        }
        Ok(())
    }

    /// Whether every dependency of `task` is `Completed`.
    ///
    /// This is the canonical dependency-satisfaction check used by both the
    /// dispatch selector and the derived `Blocked` status.
    pub fn deps_satisfied(&self, task: &Task) -> bool {
        task.dependencies.iter().all(|dep_name| match self.tasks.get(dep_name) {
            Some(dep) => dep.status == TaskStatus::Completed,
            None => {
                warn!(
                    task = %task.name,
                    dep = %dep_name,
                    "dependency missing from registry"
                );
                false
            }
        })
    }

    /// Read-only view of one task with its reported status.
    pub fn view(&self, name: &str) -> Option<TaskView> {
        let task = self.tasks.get(name)?;
        Some(TaskView::from_task(task, self.deps_satisfied(task)))
    }

    /// Views of all tasks, ordered by name.
    pub fn views(&self) -> Vec<TaskView> {
        self.tasks
            .values()
            .map(|t| TaskView::from_task(t, self.deps_satisfied(t)))
            .collect()
    }

    /// Names of tasks that directly depend on `name`.
    pub fn dependents(&self, name: &str) -> Vec<TaskName> {
        graph::dependents_of(&self.tasks, name)
            .map(|s| s.to_string())
            .collect()
    }

    /// Check structural invariants of a registry that did not come from the
    /// validated operations (e.g. a loaded document): every dependency must
    /// name a known task and the dependency graph must be acyclic.
    pub fn check_integrity(&self) -> std::result::Result<(), String> {
        for (name, task) in self.tasks.iter() {
            if &task.name != name {
                return Err(format!(
                    "task stored under key '{}' is named '{}'",
                    name, task.name
                ));
            }
            for dep in task.dependencies.iter() {
                if !self.tasks.contains_key(dep) {
                    return Err(format!("task '{}' depends on unknown task '{}'", name, dep));
                }
            }
        }

        graph::topological_order(&self.tasks)
            .map(|_| ())
            .map_err(|node| format!("dependency cycle involving task '{}'", node))
    }

    /// Bring a freshly loaded registry back to a dispatchable state.
    ///
    /// - `Running` means the previous process died mid-execution; the run is
    ///   forgotten and the task is `Pending` again.
    /// - `Blocked` is a derived status and is never kept in storage.
    /// - `retry_count` is clamped to `max_retries`.
    ///
    /// Returns the names of tasks whose interrupted run was reset.
    pub fn recover_after_restart(&mut self) -> Vec<TaskName> {
        let mut interrupted = Vec::new();

        for task in self.tasks.values_mut() {
            match task.status {
                TaskStatus::Running => {
                    warn!(task = %task.name, "task was running when the scheduler stopped; resetting to pending");
                    task.status = TaskStatus::Pending;
                    interrupted.push(task.name.clone());
                }
                TaskStatus::Blocked => task.status = TaskStatus::Pending,
                _ => {}
            }
            if task.retry_count > task.max_retries {
                task.retry_count = task.max_retries;
            }
        }

        interrupted
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::types::Priority;

    fn registry(names: &[&str]) -> Registry {
        let mut reg = Registry::new();
        for n in names {
            reg.insert(Task::new(*n, format!("echo {n}"), Priority::Medium, Utc::now()))
                .unwrap();
        }
        reg
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let mut reg = registry(&["A"]);
        let err = reg
            .insert(Task::new("A", "other", Priority::High, Utc::now()))
            .unwrap_err();
        assert!(matches!(err, TaskdagError::AlreadyExists(ref n) if n == "A"));
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("A").unwrap().command, "echo A");
    }

    #[test]
    fn add_dependency_validation_order() {
        let mut reg = registry(&["A", "B"]);

        assert!(matches!(
            reg.add_dependency("A", "missing"),
            Err(TaskdagError::NotFound(ref n)) if n == "missing"
        ));
        assert!(matches!(
            reg.add_dependency("A", "A"),
            Err(TaskdagError::SelfDependency(_))
        ));

        reg.add_dependency("B", "A").unwrap();
        let before = reg.clone();
        assert!(matches!(
            reg.add_dependency("A", "B"),
            Err(TaskdagError::WouldCreateCycle { .. })
        ));
        assert_eq!(reg, before);
    }

    #[test]
    fn re_adding_existing_edge_is_idempotent() {
        let mut reg = registry(&["A", "B"]);
        reg.add_dependency("B", "A").unwrap();
        reg.add_dependency("B", "A").unwrap();
        assert_eq!(reg.get("B").unwrap().dependencies.len(), 1);
    }

    #[test]
    fn view_derives_blocked_from_dependency_status() {
        let mut reg = registry(&["A", "B"]);
        reg.add_dependency("B", "A").unwrap();

        assert_eq!(reg.view("B").unwrap().status, TaskStatus::Blocked);
        assert_eq!(reg.view("A").unwrap().status, TaskStatus::Pending);

        reg.get_mut("A").unwrap().status = TaskStatus::Completed;
        assert_eq!(reg.view("B").unwrap().status, TaskStatus::Pending);
        // Stored status never changes.
        assert_eq!(reg.get("B").unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn integrity_check_rejects_dangling_and_cyclic_documents() {
        let mut reg = registry(&["A", "B"]);
        reg.get_mut("A").unwrap().dependencies.insert("ghost".into());
        assert!(reg.check_integrity().unwrap_err().contains("ghost"));

        let mut reg = registry(&["A", "B"]);
        reg.get_mut("A").unwrap().dependencies.insert("B".into());
        reg.get_mut("B").unwrap().dependencies.insert("A".into());
        assert!(reg.check_integrity().unwrap_err().contains("cycle"));
    }

    #[test]
    fn recovery_resets_interrupted_runs() {
        let mut reg = registry(&["A", "B", "C"]);
        reg.get_mut("A").unwrap().status = TaskStatus::Running;
        reg.get_mut("B").unwrap().status = TaskStatus::Blocked;
        reg.get_mut("C").unwrap().retry_count = 9;

        let interrupted = reg.recover_after_restart();

        assert_eq!(interrupted, vec!["A".to_string()]);
        assert_eq!(reg.get("A").unwrap().status, TaskStatus::Pending);
        assert_eq!(reg.get("B").unwrap().status, TaskStatus::Pending);
        assert_eq!(reg.get("C").unwrap().retry_count, 3);
    }
}
