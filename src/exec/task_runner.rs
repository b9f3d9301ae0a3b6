// src/exec/task_runner.rs

//! Individual task execution: run the command, interpret the result, and
//! report back to the runtime.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::engine::{ExecutionReport, RuntimeEvent, TaskOutcome};
use crate::exec::runner::{CommandOutput, CommandRunner};
use crate::registry::ScheduledTask;

/// Longest failure detail kept on a task, in bytes.
const MAX_ERROR_MESSAGE_LEN: usize = 4096;

/// Run one task's command and turn the result into an [`ExecutionReport`].
///
/// Exit code 0 is success. A non-zero exit, a timeout or a launch failure is
/// a failure carrying diagnostic text. This never returns an error: every
/// failure mode is recorded on the report.
pub async fn execute(
    task: &ScheduledTask,
    runner: &dyn CommandRunner,
    timeout: Duration,
) -> ExecutionReport {
    let started_at = Utc::now();
    info!(
        task = %task.name,
        priority = %task.priority,
        cmd = %task.command,
        "starting task process"
    );

    let outcome = match runner.run(&task.command, timeout).await {
        Ok(output) if output.success() => {
            info!(task = %task.name, exit_code = 0, "task completed successfully");
            TaskOutcome::Success
        }
        Ok(output) => {
            let message = failure_message(&output);
            warn!(
                task = %task.name,
                exit_code = ?output.exit_code,
                error = %message,
                "task failed"
            );
            TaskOutcome::Failed {
                exit_code: output.exit_code,
                message,
            }
        }
        Err(err) => {
            error!(task = %task.name, error = %err, "task execution error");
            TaskOutcome::Failed {
                exit_code: None,
                message: err.to_string(),
            }
        }
    };

    ExecutionReport {
        started_at,
        finished_at: Utc::now(),
        outcome,
    }
}

/// Worker body: execute `task` and send `TaskCompleted` to the runtime.
///
/// A shutdown request does not interrupt the command; the worker logs it and
/// keeps waiting for the command to finish or hit its timeout.
pub async fn run_task(
    task: ScheduledTask,
    runner: Arc<dyn CommandRunner>,
    timeout: Duration,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    shutdown: CancellationToken,
) {
    let exec = execute(&task, runner.as_ref(), timeout);
    tokio::pin!(exec);

    let report = tokio::select! {
        report = &mut exec => report,
        _ = shutdown.cancelled() => {
            info!(
                task = %task.name,
                "shutdown requested; waiting for running task to finish or time out"
            );
            exec.await
        }
    };

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            report,
        })
        .await
        .is_err()
    {
        error!(task = %task.name, "runtime event channel closed; dropping task outcome");
    }
}

fn failure_message(output: &CommandOutput) -> String {
    let stderr = output.stderr.trim();
    let message = if !stderr.is_empty() {
        stderr.to_string()
    } else {
        match output.exit_code {
            Some(code) => format!("command exited with code {code}"),
            None => "command terminated by signal".to_string(),
        }
    };
    truncate_tail(message, MAX_ERROR_MESSAGE_LEN)
}

/// Keep the last `max` bytes of `s` (on a char boundary).
fn truncate_tail(s: String, max: usize) -> String {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    s[start..].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::runner::{RunError, RunFuture};
    use crate::types::Priority;

    struct Fixed(fn() -> Result<CommandOutput, RunError>);

    impl CommandRunner for Fixed {
        fn run<'a>(&'a self, _command: &'a str, _timeout: Duration) -> RunFuture<'a> {
            let result = (self.0)();
            Box::pin(async move { result })
        }
    }

    fn task() -> ScheduledTask {
        ScheduledTask {
            name: "backup".into(),
            command: "run-backup.sh".into(),
            priority: Priority::High,
        }
    }

    #[tokio::test]
    async fn zero_exit_is_success() {
        let runner = Fixed(|| {
            Ok(CommandOutput {
                exit_code: Some(0),
                ..Default::default()
            })
        });
        let report = execute(&task(), &runner, Duration::from_secs(1)).await;
        assert_eq!(report.outcome, TaskOutcome::Success);
        assert!(report.finished_at >= report.started_at);
    }

    #[tokio::test]
    async fn non_zero_exit_keeps_stderr() {
        let runner = Fixed(|| {
            Ok(CommandOutput {
                exit_code: Some(2),
                stdout: "partial".into(),
                stderr: "disk full\n".into(),
            })
        });
        let report = execute(&task(), &runner, Duration::from_secs(1)).await;
        assert_eq!(
            report.outcome,
            TaskOutcome::Failed {
                exit_code: Some(2),
                message: "disk full".into()
            }
        );
    }

    #[tokio::test]
    async fn silent_failure_reports_exit_code() {
        let runner = Fixed(|| {
            Ok(CommandOutput {
                exit_code: Some(7),
                ..Default::default()
            })
        });
        let report = execute(&task(), &runner, Duration::from_secs(1)).await;
        assert_eq!(report.outcome.message(), Some("command exited with code 7"));
    }

    #[tokio::test]
    async fn timeout_and_launch_errors_are_failures() {
        let runner = Fixed(|| Err(RunError::TimedOut(Duration::from_secs(3600))));
        let report = execute(&task(), &runner, Duration::from_secs(3600)).await;
        assert!(report.outcome.message().unwrap().contains("timed out"));

        let runner = Fixed(|| {
            Err(RunError::Launch(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no such shell",
            )))
        });
        let report = execute(&task(), &runner, Duration::from_secs(1)).await;
        assert!(report.outcome.message().unwrap().contains("no such shell"));
    }

    #[test]
    fn truncation_keeps_tail_on_char_boundary() {
        let s = format!("{}é-end", "x".repeat(10));
        let t = truncate_tail(s, 5);
        assert_eq!(t, "-end");
        assert_eq!(truncate_tail("short".into(), 10), "short");
    }
}
