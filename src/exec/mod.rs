// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running task commands and
//! reporting outcomes back to the runtime via `RuntimeEvent`s.
//!
//! - [`runner`] defines the `CommandRunner` collaborator and the shell-based
//!   implementation (`tokio::process::Command` with a timeout).
//! - [`task_runner`] executes one task and interprets the result.
//! - [`backend`] provides the `ExecutorBackend` trait and the concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod runner;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use runner::{CommandOutput, CommandRunner, RunError, RunFuture, ShellCommandRunner};
pub use task_runner::execute;
