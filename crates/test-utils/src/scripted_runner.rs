use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use taskdag::exec::{CommandOutput, CommandRunner, RunError, RunFuture};

#[derive(Debug, Clone)]
enum Script {
    Exit { code: i32, stderr: String },
    Hang,
}

/// A `CommandRunner` with canned results per command string.
///
/// Unknown commands succeed. Every invocation sleeps for the configured
/// delay first, and the runner tracks how many invocations overlapped.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRunner {
    scripts: Arc<Mutex<HashMap<String, Script>>>,
    calls: Arc<Mutex<Vec<String>>>,
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// `command` exits with `code`, writing `stderr`.
    pub fn exit(self, command: &str, code: i32, stderr: &str) -> Self {
        self.scripts.lock().unwrap().insert(
            command.to_string(),
            Script::Exit {
                code,
                stderr: stderr.to_string(),
            },
        );
        self
    }

    /// `command` never finishes on its own and hits the timeout.
    pub fn hang(self, command: &str) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(command.to_string(), Script::Hang);
        self
    }

    /// Commands run so far, in start order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Highest number of simultaneously running commands observed.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl CommandRunner for ScriptedRunner {
    fn run<'a>(&'a self, command: &'a str, timeout: Duration) -> RunFuture<'a> {
        Box::pin(async move {
            self.calls.lock().unwrap().push(command.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            let script = self.scripts.lock().unwrap().get(command).cloned();
            let result = match script {
                Some(Script::Hang) => {
                    tokio::time::sleep(timeout).await;
                    Err(RunError::TimedOut(timeout))
                }
                Some(Script::Exit { code, stderr }) => {
                    tokio::time::sleep(self.delay).await;
                    Ok(CommandOutput {
                        exit_code: Some(code),
                        stdout: String::new(),
                        stderr,
                    })
                }
                None => {
                    tokio::time::sleep(self.delay).await;
                    Ok(CommandOutput {
                        exit_code: Some(0),
                        ..Default::default()
                    })
                }
            };

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            result
        })
    }
}
