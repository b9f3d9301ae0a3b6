// src/exec/backend.rs

//! Pluggable executor backend abstraction.
//!
//! The runtime talks to an `ExecutorBackend` instead of spawning processes
//! itself. This makes it easy to swap in a fake executor in tests while
//! keeping the production implementation here.
//!
//! - `RealExecutorBackend` spawns one Tokio task per dispatched task, runs the
//!   command through a [`CommandRunner`] and reports `TaskCompleted`.
//! - Tests can provide their own `ExecutorBackend` that, for example, records
//!   which tasks were dispatched and directly emits `TaskCompleted` events.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::exec::runner::{CommandRunner, ShellCommandRunner};
use crate::exec::task_runner::run_task;
use crate::registry::ScheduledTask;

/// Trait abstracting how dispatched tasks are executed.
///
/// Implementations must eventually emit exactly one
/// `RuntimeEvent::TaskCompleted` per dispatched task; the runtime keeps the
/// task in its running set until then.
pub trait ExecutorBackend: Send {
    /// Dispatch the given tasks for execution, in the given order.
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>>;
}

/// Real executor backend used in production: one concurrent worker per
/// in-flight task.
pub struct RealExecutorBackend {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    shutdown: CancellationToken,
}

impl RealExecutorBackend {
    /// Backend running commands through the platform shell.
    pub fn new(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self::with_runner(runtime_tx, Arc::new(ShellCommandRunner), timeout, shutdown)
    }

    pub fn with_runner(
        runtime_tx: mpsc::Sender<RuntimeEvent>,
        runner: Arc<dyn CommandRunner>,
        timeout: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            runtime_tx,
            runner,
            timeout,
            shutdown,
        }
    }
}

impl ExecutorBackend for RealExecutorBackend {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        Box::pin(async move {
            for task in tasks {
                debug!(task = %task.name, "spawning worker");
                tokio::spawn(run_task(
                    task,
                    Arc::clone(&self.runner),
                    self.timeout,
                    self.runtime_tx.clone(),
                    self.shutdown.clone(),
                ));
            }
            Ok(())
        })
    }
}
