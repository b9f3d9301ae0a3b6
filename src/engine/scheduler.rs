// src/engine/scheduler.rs

//! The scheduler facade: core state machine plus persistence.
//!
//! Every successful mutation is followed by a save of the full registry.
//! Save failures are logged and never surfaced to the caller; the in-memory
//! registry stays authoritative.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::ConfigFile;
use crate::engine::{CoreRuntime, SchedulerOptions, TaskName};
use crate::errors::{Result, TaskdagError};
use crate::registry::{Registry, Task, TaskView};
use crate::schedule::{CustomSchedule, ScheduleCalculator};
use crate::store::{DurableStore, Persistence};
use crate::types::{Frequency, Priority};

#[derive(Debug)]
pub struct TaskScheduler<S: DurableStore> {
    core: CoreRuntime,
    persistence: Persistence<S>,
    options: SchedulerOptions,
}

impl<S: DurableStore> TaskScheduler<S> {
    /// Load the registry from `store` and build a scheduler around it.
    ///
    /// A missing document yields an empty registry. An unreadable or
    /// inconsistent document is an error.
    pub fn open(store: S, options: SchedulerOptions) -> Result<Self> {
        let persistence = Persistence::new(store);
        let registry = persistence.load_or_default()?;
        Ok(Self::from_parts(registry, persistence, options))
    }

    /// Build a scheduler around an existing registry, without loading.
    pub fn from_parts(
        registry: Registry,
        persistence: Persistence<S>,
        options: SchedulerOptions,
    ) -> Self {
        let calculator = ScheduleCalculator::new(options.once_delay);
        Self {
            core: CoreRuntime::new(registry, calculator, options.max_retries),
            persistence,
            options,
        }
    }

    /// Use `custom` to evaluate `Custom` schedule expressions.
    pub fn with_custom_schedule(mut self, custom: Arc<dyn CustomSchedule>) -> Self {
        self.core.set_custom_schedule(custom);
        self
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    pub fn registry(&self) -> &Registry {
        self.core.registry()
    }

    pub fn core(&self) -> &CoreRuntime {
        &self.core
    }

    pub(crate) fn core_mut(&mut self) -> &mut CoreRuntime {
        &mut self.core
    }

    pub fn store(&self) -> &S {
        self.persistence.store()
    }

    pub fn add_task(&mut self, name: &str, command: &str, priority: Priority) -> Result<()> {
        self.core
            .add_task(name, command, priority, Utc::now())
            .inspect_err(log_rejection)?;
        self.persist();
        Ok(())
    }

    pub fn set_schedule(
        &mut self,
        name: &str,
        frequency: Frequency,
        custom_schedule: &str,
    ) -> Result<()> {
        self.core
            .set_schedule(name, frequency, custom_schedule, Utc::now())
            .inspect_err(log_rejection)?;
        self.persist();
        Ok(())
    }

    pub fn add_dependency(&mut self, task: &str, depends_on: &str) -> Result<()> {
        self.core
            .add_dependency(task, depends_on)
            .inspect_err(log_rejection)?;
        self.persist();
        Ok(())
    }

    pub fn list_tasks(&self) -> Vec<TaskView> {
        self.core.list_tasks()
    }

    pub fn get_task(&self, name: &str) -> Result<TaskView> {
        self.core.get_task(name)
    }

    /// Names of tasks that depend directly on `name`.
    pub fn dependents(&self, name: &str) -> Vec<TaskName> {
        self.core.registry().dependents(name)
    }

    /// Add the tasks declared in `config` that the registry does not know yet.
    ///
    /// Tasks already present are left untouched: the stored registry wins
    /// over the config file. Returns the names of the tasks that were added.
    pub fn seed_from_config(&mut self, config: &ConfigFile) -> Result<Vec<TaskName>> {
        let now = Utc::now();
        let mut added = Vec::new();

        for (name, task_cfg) in &config.task {
            if self.core.registry().contains(name) {
                continue;
            }

            let max_retries = task_cfg.max_retries.unwrap_or(self.options.max_retries);
            let task = Task::new(name.as_str(), task_cfg.cmd.as_str(), task_cfg.priority, now)
                .with_max_retries(max_retries);
            self.core.insert_task(task)?;
            self.core
                .set_schedule(name, task_cfg.frequency, &task_cfg.custom_schedule, now)?;
            added.push(name.clone());
        }

        for name in &added {
            for dep in &config.task[name].after {
                if let Err(err) = self.core.add_dependency(name, dep) {
                    warn!(
                        task = %name,
                        depends_on = %dep,
                        error = %err,
                        "skipping configured dependency"
                    );
                }
            }
        }

        if !added.is_empty() {
            info!(tasks = ?added, "seeded tasks from config");
            self.persist();
        }
        Ok(added)
    }

    /// Save the registry, returning any store failure.
    pub fn save(&self) -> Result<()> {
        self.persistence.save(self.core.registry())?;
        Ok(())
    }

    /// Save the registry, logging a failure instead of returning it.
    pub(crate) fn persist(&self) -> bool {
        self.persistence.save_or_log(self.core.registry())
    }
}

fn log_rejection(err: &TaskdagError) {
    debug!(error = %err, "operation rejected");
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::config::TaskConfig;
    use crate::store::{MemoryStore, REGISTRY_KEY};
    use crate::types::TaskStatus;

    fn scheduler(store: MemoryStore) -> TaskScheduler<MemoryStore> {
        TaskScheduler::open(store, SchedulerOptions::default()).unwrap()
    }

    #[test]
    fn every_mutation_is_persisted() {
        let store = MemoryStore::new();
        let mut sched = scheduler(store.clone());

        sched.add_task("A", "echo a", Priority::High).unwrap();
        sched.add_task("B", "echo b", Priority::Low).unwrap();
        sched.set_schedule("A", Frequency::Daily, "").unwrap();
        sched.add_dependency("B", "A").unwrap();
        assert_eq!(store.write_count(), 4);

        let reopened = scheduler(store);
        assert_eq!(reopened.registry(), sched.registry());
        assert_eq!(reopened.get_task("B").unwrap().dependencies, vec!["A"]);
    }

    #[test]
    fn rejected_mutation_is_not_persisted() {
        let store = MemoryStore::new();
        let mut sched = scheduler(store.clone());
        sched.add_task("A", "x", Priority::Medium).unwrap();

        assert!(sched.add_task("A", "y", Priority::Medium).is_err());
        assert!(sched.add_dependency("A", "A").is_err());
        assert!(sched.set_schedule("nope", Frequency::Daily, "").is_err());
        assert_eq!(store.write_count(), 1);
    }

    #[test]
    fn save_failure_does_not_fail_the_operation() {
        let store = MemoryStore::new();
        let mut sched = scheduler(store.clone());
        store.set_fail_writes(true);

        sched.add_task("A", "x", Priority::Medium).unwrap();
        assert!(sched.get_task("A").is_ok());
        assert!(sched.save().is_err());

        store.set_fail_writes(false);
        sched.add_task("B", "y", Priority::Medium).unwrap();
        let reopened = scheduler(store);
        assert_eq!(reopened.registry().len(), 2);
    }

    #[test]
    fn corrupt_document_fails_open() {
        let store = MemoryStore::new();
        store.insert(REGISTRY_KEY, "{ not json");
        let err = TaskScheduler::open(store, SchedulerOptions::default()).unwrap_err();
        assert!(matches!(err, TaskdagError::Store(_)));
    }

    #[test]
    fn get_task_unknown_is_not_found() {
        let sched = scheduler(MemoryStore::new());
        assert!(matches!(
            sched.get_task("missing"),
            Err(TaskdagError::NotFound(_))
        ));
    }

    fn task_cfg(cmd: &str, after: &[&str]) -> TaskConfig {
        TaskConfig {
            cmd: cmd.into(),
            priority: Priority::Medium,
            frequency: Frequency::Daily,
            custom_schedule: String::new(),
            after: after.iter().map(|s| s.to_string()).collect(),
            max_retries: None,
        }
    }

    #[test]
    fn seeding_adds_only_unknown_tasks() {
        let store = MemoryStore::new();
        let mut sched = scheduler(store.clone());
        sched.add_task("backup", "old-backup.sh", Priority::Low).unwrap();

        let mut tasks = BTreeMap::new();
        tasks.insert("backup".to_string(), task_cfg("new-backup.sh", &[]));
        tasks.insert("verify".to_string(), task_cfg("verify.sh", &["backup"]));
        let mut retry_once = task_cfg("report.sh", &["verify"]);
        retry_once.max_retries = Some(1);
        tasks.insert("report".to_string(), retry_once);
        let config = ConfigFile {
            task: tasks,
            ..ConfigFile::default()
        };

        let added = sched.seed_from_config(&config).unwrap();
        assert_eq!(added, vec!["report", "verify"]);

        assert_eq!(sched.get_task("backup").unwrap().command, "old-backup.sh");
        let verify = sched.get_task("verify").unwrap();
        assert_eq!(verify.dependencies, vec!["backup"]);
        assert_eq!(verify.status, TaskStatus::Blocked);
        assert!(verify.next_run.is_some());
        assert_eq!(sched.get_task("report").unwrap().max_retries, 1);

        assert!(sched.seed_from_config(&config).unwrap().is_empty());
    }
}
