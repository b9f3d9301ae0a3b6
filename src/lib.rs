// src/lib.rs

pub mod cli;
pub mod config;
pub mod display;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod registry;
pub mod schedule;
pub mod store;
pub mod types;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::{CliArgs, Command};
use crate::config::{ConfigFile, load_or_default};
use crate::engine::{Runtime, SchedulerHandle, TaskScheduler};
use crate::errors::TaskdagError;
use crate::exec::RealExecutorBackend;
use crate::store::FileStore;

/// Capacity of the runtime event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - the file-backed registry and its state-directory lock
/// - one-shot operator commands, or the scheduler loop for `run`
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_or_default(args.config.as_deref())?;

    let state_dir = args
        .state_dir
        .clone()
        .unwrap_or_else(|| cfg.state_dir.clone());
    debug!(state_dir = %state_dir.display(), "opening task registry");
    let store = FileStore::new(state_dir);

    // Held until this command returns; for `run` that is the whole scheduler
    // lifetime, so one-shot mutations fail instead of being overwritten.
    let _lock = if args.command.mutates_registry() {
        Some(store.lock().map_err(TaskdagError::from)?)
    } else {
        None
    };
    let mut scheduler = TaskScheduler::open(store, cfg.options)?;

    match args.command {
        Command::Add {
            name,
            command,
            priority,
        } => {
            scheduler.add_task(&name, &command, priority)?;
            println!("Task added: {name}");
        }
        Command::Schedule {
            name,
            frequency,
            custom,
        } => {
            scheduler.set_schedule(&name, frequency, &custom)?;
            let task = scheduler.get_task(&name)?;
            match task.next_run {
                Some(next) => println!("Schedule set for {name}: {frequency}, next run {next}"),
                None => println!("Schedule set for {name}: {frequency} (no upcoming run)"),
            }
        }
        Command::Depend { task, depends_on } => {
            scheduler.add_dependency(&task, &depends_on)?;
            println!("Dependency added: {task} now waits for {depends_on}");
        }
        Command::List { json } => {
            let tasks = scheduler.list_tasks();
            if json {
                println!("{}", serde_json::to_string_pretty(&tasks)?);
            } else {
                print!("{}", display::format_task_table(&tasks));
            }
        }
        Command::Show { name, json } => {
            let task = scheduler.get_task(&name)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&task)?);
            } else {
                let dependents = scheduler.dependents(&name);
                print!("{}", display::format_task_details(&task, &dependents));
            }
        }
        Command::Run => run_scheduler(scheduler, &cfg).await?,
    }

    Ok(())
}

/// Seed tasks from config, then run the scheduler loop until Ctrl-C.
async fn run_scheduler(mut scheduler: TaskScheduler<FileStore>, cfg: &ConfigFile) -> Result<()> {
    scheduler.seed_from_config(cfg)?;

    let (handle, rt_rx) = SchedulerHandle::channel(EVENT_CHANNEL_CAPACITY);

    // Process executor backend (real implementation in production).
    let executor = RealExecutorBackend::new(
        handle.event_sender(),
        scheduler.options().command_timeout,
        handle.shutdown_token(),
    );

    // Ctrl-C → graceful shutdown.
    {
        let handle = handle.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Ctrl+C received; shutting down");
            handle.shutdown();
        });
    }

    let runtime = Runtime::new(scheduler, rt_rx, executor, handle);
    let scheduler = runtime.run().await?;
    info!(tasks = scheduler.registry().len(), "scheduler stopped");
    Ok(())
}
