// src/config/validate.rs

use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile, SchedulerSection};
use crate::engine::SchedulerOptions;
use crate::errors::{Result, TaskdagError};
use crate::types::{Frequency, parse_duration};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TaskdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let options = validate_scheduler_section(&raw.scheduler)?;
        validate_tasks(&raw)?;
        validate_task_dependencies(&raw)?;
        validate_dag(&raw)?;
        Ok(ConfigFile::new_unchecked(
            options,
            raw.scheduler.state_dir,
            raw.task,
        ))
    }
}

fn validate_scheduler_section(section: &SchedulerSection) -> Result<SchedulerOptions> {
    let poll_interval = duration_field("poll_interval", &section.poll_interval, false)?;
    let command_timeout = duration_field("command_timeout", &section.command_timeout, false)?;
    let once_delay = duration_field("once_delay", &section.once_delay, true)?;

    if section.max_retries == 0 {
        return Err(TaskdagError::ConfigError(
            "[scheduler].max_retries must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(SchedulerOptions {
        poll_interval,
        command_timeout,
        once_delay,
        max_retries: section.max_retries,
    })
}

fn duration_field(field: &str, value: &str, allow_zero: bool) -> Result<Duration> {
    let duration = parse_duration(value)
        .map_err(|e| TaskdagError::ConfigError(format!("[scheduler].{field}: {e}")))?;
    if !allow_zero && duration.is_zero() {
        return Err(TaskdagError::ConfigError(format!(
            "[scheduler].{field} must be greater than zero"
        )));
    }
    Ok(duration)
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if task.cmd.trim().is_empty() {
            return Err(TaskdagError::ConfigError(format!(
                "task '{name}' has an empty `cmd`"
            )));
        }
        if task.max_retries == Some(0) {
            return Err(TaskdagError::ConfigError(format!(
                "task '{name}': max_retries must be >= 1 (got 0)"
            )));
        }
        if task.frequency == Frequency::Custom && task.custom_schedule.trim().is_empty() {
            return Err(TaskdagError::ConfigError(format!(
                "task '{name}' has frequency \"custom\" but no custom_schedule"
            )));
        }
    }
    Ok(())
}

fn validate_task_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            if dep == name {
                return Err(TaskdagError::ConfigError(format!(
                    "task '{name}' cannot depend on itself in `after`"
                )));
            }
            if !cfg.task.contains_key(dep) {
                return Err(TaskdagError::ConfigError(format!(
                    "task '{name}' has unknown dependency '{dep}' in `after`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.task.keys() {
        graph.add_node(name.as_str());
    }

    for (name, task) in cfg.task.iter() {
        for dep in task.after.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(TaskdagError::ConfigError(format!(
            "dependency cycle in configured tasks involving '{}'",
            cycle.node_id()
        ))),
    }
}
