use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio::sync::mpsc;
use taskdag::engine::{ExecutionReport, RuntimeEvent, TaskOutcome};
use taskdag::errors::Result;
use taskdag::exec::ExecutorBackend;
use taskdag::registry::ScheduledTask;

/// A fake executor that:
/// - records which tasks were "run", in dispatch order
/// - immediately reports `TaskCompleted` for each dispatched task, using the
///   next scripted outcome for that task (success when none is scripted).
pub struct FakeExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    executed: Arc<Mutex<Vec<String>>>,
    scripted: HashMap<String, VecDeque<TaskOutcome>>,
}

impl FakeExecutor {
    pub fn new(runtime_tx: mpsc::Sender<RuntimeEvent>, executed: Arc<Mutex<Vec<String>>>) -> Self {
        Self {
            runtime_tx,
            executed,
            scripted: HashMap::new(),
        }
    }

    /// Queue an outcome for the next run of `task`.
    pub fn script(mut self, task: &str, outcome: TaskOutcome) -> Self {
        self.scripted
            .entry(task.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Make every run of `task` fail with `exit_code` (up to `runs` times).
    pub fn fail(mut self, task: &str, exit_code: i32, runs: usize) -> Self {
        for _ in 0..runs {
            self = self.script(
                task,
                TaskOutcome::Failed {
                    exit_code: Some(exit_code),
                    message: format!("command exited with code {exit_code}"),
                },
            );
        }
        self
    }
}

impl ExecutorBackend for FakeExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let tx = self.runtime_tx.clone();
        let executed = Arc::clone(&self.executed);

        Box::pin(async move {
            for t in tasks {
                executed.lock().unwrap().push(t.name.clone());

                let outcome = self
                    .scripted
                    .get_mut(&t.name)
                    .and_then(|q| q.pop_front())
                    .unwrap_or(TaskOutcome::Success);
                let now = Utc::now();

                tx.send(RuntimeEvent::TaskCompleted {
                    task: t.name.clone(),
                    report: ExecutionReport {
                        started_at: now,
                        finished_at: now,
                        outcome,
                    },
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}
