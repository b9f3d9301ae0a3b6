// src/store/persistence.rs

//! Registry <-> durable store adapter.

use tracing::{debug, error, info};

use crate::registry::Registry;

use super::{DurableStore, StoreError};

/// Well-known key the registry document is stored under.
pub const REGISTRY_KEY: &str = "tasks.json";

/// Serializes the full registry into one JSON document (task name -> task
/// record) and back.
#[derive(Debug, Clone)]
pub struct Persistence<S: DurableStore> {
    store: S,
    key: String,
}

impl<S: DurableStore> Persistence<S> {
    pub fn new(store: S) -> Self {
        Self::with_key(store, REGISTRY_KEY)
    }

    pub fn with_key(store: S, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn save(&self, registry: &Registry) -> Result<(), StoreError> {
        let blob = serde_json::to_vec_pretty(registry)?;
        self.store.write(&self.key, &blob)?;
        debug!(key = %self.key, tasks = registry.len(), bytes = blob.len(), "registry saved");
        Ok(())
    }

    /// Save, logging instead of returning a failure.
    ///
    /// The in-memory registry stays authoritative; the mutation is lost only
    /// if the process restarts before the next successful save.
    pub fn save_or_log(&self, registry: &Registry) -> bool {
        match self.save(registry) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    key = %self.key,
                    error = %err,
                    "failed to persist registry; in-memory state remains authoritative"
                );
                false
            }
        }
    }

    /// Load and validate the registry document.
    ///
    /// A missing document is [`StoreError::NotFound`]; a document with
    /// dangling dependencies or a dependency cycle is [`StoreError::Corrupt`].
    /// Interrupted runs are reset (see [`Registry::recover_after_restart`]).
    pub fn load(&self) -> Result<Registry, StoreError> {
        let blob = self.store.read(&self.key)?;
        let mut registry: Registry = serde_json::from_slice(&blob)?;
        registry.check_integrity().map_err(StoreError::Corrupt)?;

        let interrupted = registry.recover_after_restart();
        info!(
            key = %self.key,
            tasks = registry.len(),
            interrupted = interrupted.len(),
            "registry loaded"
        );
        Ok(registry)
    }

    /// Load the registry, treating a missing document as an empty registry.
    pub fn load_or_default(&self) -> Result<Registry, StoreError> {
        match self.load() {
            Ok(registry) => Ok(registry),
            Err(StoreError::NotFound(_)) => {
                info!(key = %self.key, "no stored registry; starting empty");
                Ok(Registry::new())
            }
            Err(err) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, Utc};

    use super::*;
    use crate::registry::Task;
    use crate::store::MemoryStore;
    use crate::types::{Frequency, Priority, TaskStatus};

    fn sample_registry() -> Registry {
        let now = Utc::now();
        let mut reg = Registry::new();
        reg.insert(Task::new("backup", "run-backup.sh", Priority::High, now))
            .unwrap();
        reg.insert(Task::new("verify", "verify.sh", Priority::Medium, now))
            .unwrap();
        reg.insert(Task::new("report", "report.sh", Priority::Low, now))
            .unwrap();
        reg.add_dependency("verify", "backup").unwrap();
        reg.add_dependency("report", "verify").unwrap();
        reg.add_dependency("report", "backup").unwrap();

        let backup = reg.get_mut("backup").unwrap();
        backup.status = TaskStatus::Completed;
        backup.frequency = Frequency::Daily;
        backup.last_run = Some(now);
        backup.next_run = Some(now + TimeDelta::days(1));

        let verify = reg.get_mut("verify").unwrap();
        verify.status = TaskStatus::Failed;
        verify.retry_count = 2;
        verify.error_message = "checksum mismatch".into();
        verify.frequency = Frequency::Custom;
        verify.custom_schedule = "every 6h".into();
        reg
    }

    #[test]
    fn save_then_load_reproduces_registry() {
        let store = MemoryStore::new();
        let persistence = Persistence::new(store.clone());
        let reg = sample_registry();

        persistence.save(&reg).unwrap();
        let loaded = persistence.load().unwrap();

        assert_eq!(loaded, reg);
        let names: Vec<_> = loaded.task_names().collect();
        assert_eq!(names, vec!["backup", "report", "verify"]);
        assert_eq!(loaded.get("verify").unwrap().retry_count, 2);
    }

    #[test]
    fn document_is_a_map_with_ordered_dependency_lists() {
        let store = MemoryStore::new();
        let persistence = Persistence::new(store.clone());
        persistence.save(&sample_registry()).unwrap();

        let doc: serde_json::Value =
            serde_json::from_slice(&store.get(REGISTRY_KEY).unwrap()).unwrap();
        assert_eq!(doc["report"]["dependencies"], serde_json::json!(["backup", "verify"]));
        assert_eq!(doc["backup"]["priority"], "high");
        assert_eq!(doc["verify"]["status"], "failed");
        assert!(doc["backup"]["created_at"].as_str().unwrap().contains('T'));
    }

    #[test]
    fn load_missing_document() {
        let persistence = Persistence::new(MemoryStore::new());
        assert!(matches!(persistence.load(), Err(StoreError::NotFound(_))));
        assert!(persistence.load_or_default().unwrap().is_empty());
    }

    #[test]
    fn load_rejects_cyclic_document() {
        let store = MemoryStore::new();
        let now = Utc::now().to_rfc3339();
        let doc = serde_json::json!({
            "A": { "name": "A", "command": "a", "dependencies": ["B"], "created_at": now },
            "B": { "name": "B", "command": "b", "dependencies": ["A"], "created_at": now },
        });
        store.insert(REGISTRY_KEY, serde_json::to_vec(&doc).unwrap());

        let err = Persistence::new(store).load().unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }

    #[test]
    fn load_resets_interrupted_runs() {
        let store = MemoryStore::new();
        let persistence = Persistence::new(store);
        let mut reg = sample_registry();
        reg.get_mut("report").unwrap().status = TaskStatus::Running;
        persistence.save(&reg).unwrap();

        let loaded = persistence.load().unwrap();
        assert_eq!(loaded.get("report").unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn save_or_log_swallows_store_failures() {
        let store = MemoryStore::new();
        let persistence = Persistence::new(store.clone());
        store.set_fail_writes(true);
        assert!(!persistence.save_or_log(&sample_registry()));
        assert!(store.get(REGISTRY_KEY).is_none());
    }
}
