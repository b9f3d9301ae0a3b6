// src/store/memory.rs

use std::collections::HashMap;
use std::io::{Error, ErrorKind};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{DurableStore, StoreError};

/// In-memory store. Clones share the same contents, so a test can keep one
/// clone to inspect what the scheduler wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    fail_writes: Arc<AtomicBool>,
    writes: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `write` fail with an IO error (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.lock().ok()?.get(key).cloned()
    }

    pub fn insert(&self, key: &str, blob: impl Into<Vec<u8>>) {
        if let Ok(mut blobs) = self.blobs.lock() {
            blobs.insert(key.to_string(), blob.into());
        }
    }
}

impl DurableStore for MemoryStore {
    fn write(&self, key: &str, blob: &[u8]) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                key: key.to_string(),
                source: Error::new(ErrorKind::Other, "injected write failure"),
            });
        }

        let mut blobs = self.blobs.lock().map_err(|e| StoreError::Io {
            key: key.to_string(),
            source: Error::new(ErrorKind::Other, e.to_string()),
        })?;
        blobs.insert(key.to_string(), blob.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let blobs = self.blobs.lock().map_err(|e| StoreError::Io {
            key: key.to_string(),
            source: Error::new(ErrorKind::Other, e.to_string()),
        })?;
        blobs
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }
}
