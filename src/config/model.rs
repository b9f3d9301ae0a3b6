// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::engine::SchedulerOptions;
use crate::types::{Frequency, Priority};

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [scheduler]
/// poll_interval = "1s"
/// command_timeout = "1h"
/// once_delay = "1m"
/// max_retries = 3
/// state_dir = ".taskdag"
///
/// [task.backup]
/// cmd = "run-backup.sh"
/// priority = "high"
/// frequency = "daily"
///
/// [task.verify]
/// cmd = "verify-backup.sh"
/// frequency = "daily"
/// after = ["backup"]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: SchedulerSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[scheduler]` section. Durations use the compact `"250ms"`/`"3s"`/`"1h"`
/// syntax.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default = "default_command_timeout")]
    pub command_timeout: String,

    #[serde(default = "default_once_delay")]
    pub once_delay: String,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Directory holding the persisted registry.
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
}

fn default_poll_interval() -> String {
    "1s".to_string()
}

fn default_command_timeout() -> String {
    "1h".to_string()
}

fn default_once_delay() -> String {
    "1m".to_string()
}

fn default_max_retries() -> u32 {
    crate::registry::task::DEFAULT_MAX_RETRIES
}

fn default_state_dir() -> PathBuf {
    PathBuf::from(".taskdag")
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
            command_timeout: default_command_timeout(),
            once_delay: default_once_delay(),
            max_retries: default_max_retries(),
            state_dir: default_state_dir(),
        }
    }
}

/// `[task.<name>]` section: a task to register at startup if the stored
/// registry does not already have it.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// The command to execute.
    pub cmd: String,

    #[serde(default)]
    pub priority: Priority,

    #[serde(default)]
    pub frequency: Frequency,

    /// Expression for `frequency = "custom"`, e.g. `"every 30m"`.
    #[serde(default)]
    pub custom_schedule: String,

    /// This task waits for all tasks listed here.
    #[serde(default)]
    pub after: Vec<String>,

    /// Overrides `[scheduler].max_retries` for this task.
    #[serde(default)]
    pub max_retries: Option<u32>,
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub options: SchedulerOptions,
    pub state_dir: PathBuf,
    pub task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        options: SchedulerOptions,
        state_dir: PathBuf,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self {
            options,
            state_dir,
            task,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self::new_unchecked(SchedulerOptions::default(), default_state_dir(), BTreeMap::new())
    }
}
