// src/engine/handle.rs

//! Cloneable handle for talking to a running [`Runtime`](super::Runtime).
//!
//! Operations are forwarded as [`OperatorRequest`]s over the runtime's event
//! channel and answered through a oneshot reply, so they are serialized with
//! dispatch ticks and task completions.

use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use crate::engine::{OperatorRequest, RuntimeEvent};
use crate::errors::{Result, TaskdagError};
use crate::registry::TaskView;
use crate::types::{Frequency, Priority};

#[derive(Debug, Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<RuntimeEvent>,
    shutdown: CancellationToken,
}

impl SchedulerHandle {
    /// Create a handle and the receiver the runtime should consume.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<RuntimeEvent>) {
        let (tx, rx) = mpsc::channel(capacity);
        let handle = Self {
            tx,
            shutdown: CancellationToken::new(),
        };
        (handle, rx)
    }

    /// Sender for workers reporting `TaskCompleted`.
    pub fn event_sender(&self) -> mpsc::Sender<RuntimeEvent> {
        self.tx.clone()
    }

    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Ask the runtime to stop. Idempotent.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub async fn add_task(
        &self,
        name: impl Into<String>,
        command: impl Into<String>,
        priority: Priority,
    ) -> Result<()> {
        let (name, command) = (name.into(), command.into());
        self.request(|reply| OperatorRequest::AddTask {
            name,
            command,
            priority,
            reply,
        })
        .await?
    }

    pub async fn set_schedule(
        &self,
        name: impl Into<String>,
        frequency: Frequency,
        custom_schedule: impl Into<String>,
    ) -> Result<()> {
        let (name, custom_schedule) = (name.into(), custom_schedule.into());
        self.request(|reply| OperatorRequest::SetSchedule {
            name,
            frequency,
            custom_schedule,
            reply,
        })
        .await?
    }

    pub async fn add_dependency(
        &self,
        task: impl Into<String>,
        depends_on: impl Into<String>,
    ) -> Result<()> {
        let (task, depends_on) = (task.into(), depends_on.into());
        self.request(|reply| OperatorRequest::AddDependency {
            task,
            depends_on,
            reply,
        })
        .await?
    }

    pub async fn list_tasks(&self) -> Result<Vec<TaskView>> {
        self.request(|reply| OperatorRequest::ListTasks { reply })
            .await
    }

    pub async fn get_task(&self, name: impl Into<String>) -> Result<TaskView> {
        let name = name.into();
        self.request(|reply| OperatorRequest::GetTask { name, reply })
            .await?
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> OperatorRequest,
    ) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(RuntimeEvent::Request(make(reply)))
            .await
            .map_err(|_| TaskdagError::SchedulerStopped)?;
        rx.await.map_err(|_| TaskdagError::SchedulerStopped)
    }
}
