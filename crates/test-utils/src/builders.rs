use std::collections::BTreeMap;
use std::path::PathBuf;

use taskdag::config::{ConfigFile, RawConfigFile, SchedulerSection, TaskConfig};
use taskdag::types::{Frequency, Priority};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                scheduler: SchedulerSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    pub fn poll_interval(mut self, value: &str) -> Self {
        self.config.scheduler.poll_interval = value.to_string();
        self
    }

    pub fn command_timeout(mut self, value: &str) -> Self {
        self.config.scheduler.command_timeout = value.to_string();
        self
    }

    pub fn once_delay(mut self, value: &str) -> Self {
        self.config.scheduler.once_delay = value.to_string();
        self
    }

    pub fn max_retries(mut self, value: u32) -> Self {
        self.config.scheduler.max_retries = value;
        self
    }

    pub fn state_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.scheduler.state_dir = dir.into();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                priority: Priority::Medium,
                frequency: Frequency::Once,
                custom_schedule: String::new(),
                after: vec![],
                max_retries: None,
            },
        }
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.task.priority = priority;
        self
    }

    pub fn frequency(mut self, frequency: Frequency) -> Self {
        self.task.frequency = frequency;
        self
    }

    pub fn custom(mut self, expr: &str) -> Self {
        self.task.frequency = Frequency::Custom;
        self.task.custom_schedule = expr.to_string();
        self
    }

    pub fn max_retries(mut self, value: u32) -> Self {
        self.task.max_retries = Some(value);
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
