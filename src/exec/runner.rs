// src/exec/runner.rs

//! Command runner: the OS-level mechanism that executes a command string and
//! returns its exit code and captured output.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::time::Duration;

use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

#[derive(Error, Debug)]
pub enum RunError {
    #[error("failed to launch command: {0}")]
    Launch(#[source] std::io::Error),

    #[error("command timed out after {0:?}")]
    TimedOut(Duration),

    #[error("failed waiting for command: {0}")]
    Wait(#[source] std::io::Error),
}

pub type RunFuture<'a> = Pin<Box<dyn Future<Output = Result<CommandOutput, RunError>> + Send + 'a>>;

/// Trait abstracting how a command string is executed.
///
/// Implementations must support independent, concurrent invocations.
/// Production code uses [`ShellCommandRunner`]; tests can script outcomes.
pub trait CommandRunner: Send + Sync {
    fn run<'a>(&'a self, command: &'a str, timeout: Duration) -> RunFuture<'a>;
}

/// Runs commands through the platform shell (`sh -c` / `cmd /C`).
///
/// The child is killed if it outlives `timeout`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShellCommandRunner;

fn shell_command(command: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(command);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(command);
        c
    }
}

impl CommandRunner for ShellCommandRunner {
    fn run<'a>(&'a self, command: &'a str, timeout: Duration) -> RunFuture<'a> {
        Box::pin(async move {
            let mut cmd = shell_command(command);
            cmd.stdin(Stdio::null())
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true);

            let child = cmd.spawn().map_err(RunError::Launch)?;
            debug!(cmd = %command, pid = ?child.id(), "spawned command");

            // Dropping the wait future on timeout drops the child, which
            // kills it (kill_on_drop).
            match tokio::time::timeout(timeout, child.wait_with_output()).await {
                Ok(Ok(output)) => Ok(CommandOutput {
                    exit_code: output.status.code(),
                    stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                    stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
                }),
                Ok(Err(e)) => Err(RunError::Wait(e)),
                Err(_elapsed) => Err(RunError::TimedOut(timeout)),
            }
        })
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_exit_code_and_output() {
        let out = ShellCommandRunner
            .run("echo hello; echo oops >&2; exit 3", Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out.exit_code, Some(3));
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
        assert!(!out.success());
    }

    #[tokio::test]
    async fn times_out_long_commands() {
        let err = ShellCommandRunner
            .run("sleep 5", Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::TimedOut(_)));
    }
}
