// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::types::{Frequency, Priority};

/// Command-line arguments for `taskdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "taskdag",
    version,
    about = "Run shell commands on a schedule, respecting priorities and dependencies.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Taskdag.toml` in the current working directory, if present.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory holding the task registry. Overrides `[scheduler].state_dir`.
    #[arg(long, global = true, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TASKDAG_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Register a new task.
    Add {
        name: String,
        /// Shell command to run.
        command: String,
        #[arg(long, short, default_value_t = Priority::Medium, value_parser = parse_priority)]
        priority: Priority,
    },

    /// Assign a schedule to a task.
    Schedule {
        name: String,
        #[arg(value_parser = parse_frequency)]
        frequency: Frequency,
        /// Expression for the `custom` frequency, e.g. "every 30m".
        #[arg(long, value_name = "EXPR", default_value = "")]
        custom: String,
    },

    /// Make TASK wait for DEPENDS_ON to complete.
    Depend { task: String, depends_on: String },

    /// List all tasks.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show one task in detail.
    Show {
        name: String,
        #[arg(long)]
        json: bool,
    },

    /// Run the scheduler until Ctrl-C.
    Run,
}

impl Command {
    /// Whether the command writes the registry back to the state directory.
    pub fn mutates_registry(&self) -> bool {
        !matches!(self, Command::List { .. } | Command::Show { .. })
    }
}

fn parse_priority(s: &str) -> Result<Priority, String> {
    s.parse()
}

fn parse_frequency(s: &str) -> Result<Frequency, String> {
    s.parse()
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
