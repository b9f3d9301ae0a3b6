// src/engine/runtime.rs

use std::fmt;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::ExecutorBackend;
use crate::registry::ScheduledTask;
use crate::store::DurableStore;

use super::{
    CoreCommand, CoreEvent, OperatorRequest, RuntimeEvent, SchedulerHandle, TaskScheduler,
};

/// Drives the scheduler: a dispatch tick every poll interval, completions
/// from workers, and operator requests, all on one loop.
///
/// This is a pure IO shell around `CoreRuntime`, which contains all the
/// scheduling semantics. Only this loop mutates the registry, so registry
/// writes and saves never interleave.
///
/// On shutdown the loop stops dispatching, waits for in-flight tasks to
/// report (each bounded by the command timeout), saves once more, and
/// returns the scheduler.
pub struct Runtime<E: ExecutorBackend, S: DurableStore> {
    scheduler: TaskScheduler<S>,
    event_rx: mpsc::Receiver<RuntimeEvent>,
    executor: E,
    handle: SchedulerHandle,
}

impl<E: ExecutorBackend, S: DurableStore> fmt::Debug for Runtime<E, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .finish_non_exhaustive()
    }
}

impl<E: ExecutorBackend, S: DurableStore> Runtime<E, S> {
    /// `event_rx` must be the receiver paired with `handle`.
    pub fn new(
        scheduler: TaskScheduler<S>,
        event_rx: mpsc::Receiver<RuntimeEvent>,
        executor: E,
        handle: SchedulerHandle,
    ) -> Self {
        Self {
            scheduler,
            event_rx,
            executor,
            handle,
        }
    }

    /// Main event loop.
    ///
    /// - Ticks every `poll_interval`, dispatching ready tasks.
    /// - Records outcomes reported by workers.
    /// - Serves operator requests.
    ///
    /// Returns once shutdown was requested and every in-flight task has
    /// reported.
    pub async fn run(mut self) -> Result<TaskScheduler<S>> {
        let poll = self.scheduler.options().poll_interval;
        info!(poll_interval = ?poll, tasks = self.scheduler.registry().len(), "taskdag runtime started");

        let shutdown = self.handle.shutdown_token();
        let mut ticker = tokio::time::interval(poll);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("shutdown requested; no further tasks will be dispatched");
                    break;
                }
                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event).await?;
                }
                _ = ticker.tick() => {
                    self.tick().await?;
                }
            }
        }

        self.drain().await?;

        self.scheduler.persist();
        info!("runtime exiting");
        Ok(self.scheduler)
    }

    /// Keep recording outcomes (and answering requests) until no task is
    /// running.
    async fn drain(&mut self) -> Result<()> {
        while self.scheduler.core().running_count() > 0 {
            info!(
                running = self.scheduler.core().running_count(),
                "waiting for running tasks to finish"
            );
            match self.event_rx.recv().await {
                Some(event) => self.handle_event(event).await?,
                None => break,
            }
        }
        Ok(())
    }

    async fn tick(&mut self) -> Result<()> {
        let step = self
            .scheduler
            .core_mut()
            .step(CoreEvent::Tick { now: Utc::now() });
        for command in step.commands {
            self.execute_command(command).await?;
        }
        Ok(())
    }

    async fn handle_event(&mut self, event: RuntimeEvent) -> Result<()> {
        debug!(?event, "runtime received event");

        match event {
            RuntimeEvent::TaskCompleted { task, report } => {
                let step = self
                    .scheduler
                    .core_mut()
                    .step(CoreEvent::TaskCompleted { task, report });
                for command in step.commands {
                    self.execute_command(command).await?;
                }
            }
            RuntimeEvent::Request(request) => self.handle_request(request),
        }
        Ok(())
    }

    fn handle_request(&mut self, request: OperatorRequest) {
        // A dropped reply receiver means the caller gave up; nothing to do.
        match request {
            OperatorRequest::AddTask {
                name,
                command,
                priority,
                reply,
            } => {
                let _ = reply.send(self.scheduler.add_task(&name, &command, priority));
            }
            OperatorRequest::SetSchedule {
                name,
                frequency,
                custom_schedule,
                reply,
            } => {
                let _ = reply.send(self.scheduler.set_schedule(&name, frequency, &custom_schedule));
            }
            OperatorRequest::AddDependency {
                task,
                depends_on,
                reply,
            } => {
                let _ = reply.send(self.scheduler.add_dependency(&task, &depends_on));
            }
            OperatorRequest::ListTasks { reply } => {
                let _ = reply.send(self.scheduler.list_tasks());
            }
            OperatorRequest::GetTask { name, reply } => {
                let _ = reply.send(self.scheduler.get_task(&name));
            }
        }
    }

    /// Execute a single command from the core.
    async fn execute_command(&mut self, command: CoreCommand) -> Result<()> {
        match command {
            CoreCommand::DispatchTasks(tasks) => {
                self.spawn_ready(tasks).await?;
            }
            CoreCommand::Persist => {
                self.scheduler.persist();
            }
        }
        Ok(())
    }

    async fn spawn_ready(&mut self, tasks: Vec<ScheduledTask>) -> Result<()> {
        if tasks.is_empty() {
            return Ok(());
        }

        let names: Vec<_> = tasks.iter().map(|t| t.name.as_str()).collect();
        debug!(?names, "spawning ready tasks");

        self.executor.spawn_ready_tasks(tasks).await
    }
}
