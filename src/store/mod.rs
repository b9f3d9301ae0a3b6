// src/store/mod.rs

//! Durable storage for the task registry.
//!
//! - [`DurableStore`] is the narrow key/blob interface the scheduler consumes.
//! - [`FileStore`] keeps one file per key under a root directory, and hands
//!   out a [`StateLock`] so only one process mutates it at a time.
//! - [`memory::MemoryStore`] is an in-memory implementation for tests.
//! - [`persistence::Persistence`] serializes the whole registry under one
//!   well-known key.

use std::fmt::Debug;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

pub mod memory;
pub mod persistence;

pub use memory::MemoryStore;
pub use persistence::{Persistence, REGISTRY_KEY};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no value stored under key '{0}'")]
    NotFound(String),

    #[error("IO error on key '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "state directory {} is in use by another taskdag process (is `taskdag run` active?)",
        .0.display()
    )]
    Locked(PathBuf),

    #[error("stored registry is invalid: {0}")]
    Corrupt(String),

    #[error("registry (de)serialization failed: {0}")]
    Serde(#[from] serde_json::Error),
}

impl StoreError {
    fn io(key: &str, source: std::io::Error) -> Self {
        StoreError::Io {
            key: key.to_string(),
            source,
        }
    }
}

/// Abstract key/blob store.
pub trait DurableStore: Send + Sync + Debug {
    fn write(&self, key: &str, blob: &[u8]) -> Result<(), StoreError>;

    /// Read the blob under `key`; a missing key is [`StoreError::NotFound`].
    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// Name of the lock file inside a [`FileStore`] root.
pub const LOCK_FILE: &str = "taskdag.lock";

/// Exclusive hold on a [`FileStore`] root, released on drop.
///
/// Every process that loads the registry and writes it back must hold this
/// for as long as it keeps the registry in memory; otherwise its saves would
/// overwrite changes made by the other process.
#[derive(Debug)]
pub struct StateLock {
    _file: fs::File,
    path: PathBuf,
}

impl StateLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Store backed by plain files: `<root>/<key>`.
///
/// Writes go to `<root>/<key>.tmp` first and are then renamed over the
/// target, so readers never observe a partially written blob.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Take the exclusive lock on this store's root without blocking.
    ///
    /// Fails with [`StoreError::Locked`] while another holder exists.
    pub fn lock(&self) -> Result<StateLock, StoreError> {
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(LOCK_FILE, e))?;

        let path = self.path_for(LOCK_FILE);
        let file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| StoreError::io(LOCK_FILE, e))?;

        match file.try_lock() {
            Ok(()) => Ok(StateLock { _file: file, path }),
            Err(fs::TryLockError::WouldBlock) => Err(StoreError::Locked(self.root.clone())),
            Err(fs::TryLockError::Error(e)) => Err(StoreError::io(LOCK_FILE, e)),
        }
    }
}

impl DurableStore for FileStore {
    fn write(&self, key: &str, blob: &[u8]) -> Result<(), StoreError> {
        fs::create_dir_all(&self.root).map_err(|e| StoreError::io(key, e))?;

        let target = self.path_for(key);
        let tmp = self.path_for(&format!("{key}.tmp"));

        let mut file = fs::File::create(&tmp).map_err(|e| StoreError::io(key, e))?;
        file.write_all(blob).map_err(|e| StoreError::io(key, e))?;
        file.sync_all().map_err(|e| StoreError::io(key, e))?;
        drop(file);

        fs::rename(&tmp, &target).map_err(|e| StoreError::io(key, e))?;
        Ok(())
    }

    fn read(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound(key.to_string())),
            Err(e) => Err(StoreError::io(key, e)),
        }
    }
}
