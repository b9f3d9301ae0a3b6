// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Error, Debug)]
pub enum TaskdagError {
    #[error("Task already exists: {0}")]
    AlreadyExists(String),

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Task '{0}' cannot depend on itself")]
    SelfDependency(String),

    #[error("Dependency '{task}' -> '{depends_on}' would create a cycle")]
    WouldCreateCycle { task: String, depends_on: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Scheduler is not running")]
    SchedulerStopped,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TaskdagError {
    /// Whether this is an expected rejection of caller input rather than a
    /// failure of the scheduler itself.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            TaskdagError::AlreadyExists(_)
                | TaskdagError::NotFound(_)
                | TaskdagError::SelfDependency(_)
                | TaskdagError::WouldCreateCycle { .. }
        )
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TaskdagError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn caller_rejections_are_validation_errors() {
        assert!(TaskdagError::AlreadyExists("a".into()).is_validation());
        assert!(TaskdagError::NotFound("a".into()).is_validation());
        assert!(TaskdagError::SelfDependency("a".into()).is_validation());
        assert!(
            TaskdagError::WouldCreateCycle {
                task: "a".into(),
                depends_on: "b".into(),
            }
            .is_validation()
        );

        assert!(!TaskdagError::SchedulerStopped.is_validation());
        assert!(!TaskdagError::ConfigError("bad".into()).is_validation());
        assert!(!TaskdagError::Store(StoreError::Locked("/tmp/state".into())).is_validation());
    }

    #[test]
    fn rejection_survives_anyhow_wrapping() {
        let err = anyhow::Error::from(TaskdagError::NotFound("ghost".into()));
        let inner = err.downcast_ref::<TaskdagError>().unwrap();
        assert!(inner.is_validation());
        assert_eq!(inner.to_string(), "Task not found: ghost");
    }
}
