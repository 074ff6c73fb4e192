//! External storage for cached collections.
//!
//! # Responsibilities
//! - Keep every collection's writable items in one JSON slot
//! - Rehydrate a collection on first access
//! - Recover from unreadable or corrupt data by resetting it
//!
//! # Design Decisions
//! - Layout is `{ "<cache key>": { "writableData": [...] } }`; read views are
//!   never stored
//! - Best effort: failures are logged and counted, never returned to callers
//! - Read-modify-write of the slot is serialized by a mutex

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::observability::metrics;
use crate::store::collection::Record;

/// Key/value storage holding raw slot contents.
pub trait StorageBackend: Send + Sync {
    fn get(&self, key: &str) -> io::Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> io::Result<()>;
    fn remove(&self, key: &str) -> io::Result<()>;
}

/// Stores each slot as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileBackend {
    dir: PathBuf,
}

impl FileBackend {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> io::Result<PathBuf> {
        if !is_file_safe_key(key) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("storage key `{}` cannot be used as a file name", key),
            ));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

/// Whether `key` names a file directly inside the storage directory.
pub fn is_file_safe_key(key: &str) -> bool {
    !key.trim().is_empty() && !key.contains(|c: char| c == '/' || c == '\\') && !key.contains("..")
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        match fs::read_to_string(self.path(key)?) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key)?, value)
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        match fs::remove_file(self.path(key)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// In-process storage; clones share the same slots.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    slots: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> io::Result<Option<String>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> io::Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> io::Result<()> {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.remove(key);
        Ok(())
    }
}

/// Failure reading or writing the storage slot.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("stored data is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Persisted form of one collection.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedCollection {
    #[serde(rename = "writableData")]
    writable_data: Vec<Record>,
}

/// Synchronized access to the slot holding all persisted collections.
pub struct PersistentCache {
    backend: Box<dyn StorageBackend>,
    slot: String,
    lock: Mutex<()>,
}

impl PersistentCache {
    pub fn new(backend: Box<dyn StorageBackend>, slot: impl Into<String>) -> Self {
        Self {
            backend,
            slot: slot.into(),
            lock: Mutex::new(()),
        }
    }

    /// Stored items for `cache_key`, or `None` on a miss.
    pub fn load(&self, cache_key: &str) -> Option<Vec<Record>> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        let mut blob = match self.read_slot() {
            Ok(Some(blob)) => blob,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(slot = %self.slot, error = %e, "Resetting external storage");
                metrics::record_storage_reset("slot");
                if let Err(e) = self.backend.remove(&self.slot) {
                    tracing::warn!(slot = %self.slot, error = %e, "Failed to clear external storage");
                }
                return None;
            }
        };

        let entry = blob.get(cache_key)?.clone();
        match serde_json::from_value::<PersistedCollection>(entry) {
            Ok(persisted) => Some(persisted.writable_data),
            Err(e) => {
                tracing::warn!(cache_key, error = %e, "Dropping corrupt stored collection");
                metrics::record_storage_reset("entry");
                blob.remove(cache_key);
                if let Err(e) = self.write_slot(&blob) {
                    tracing::warn!(slot = %self.slot, error = %e, "Failed to rewrite external storage");
                }
                None
            }
        }
    }

    /// Store `items` under `cache_key`.
    pub fn save(&self, cache_key: &str, items: &[Record]) {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);

        // A corrupt slot is replaced rather than merged into
        let mut blob = self.read_slot().ok().flatten().unwrap_or_default();
        let entry = PersistedCollection {
            writable_data: items.to_vec(),
        };
        match serde_json::to_value(entry) {
            Ok(value) => {
                blob.insert(cache_key.to_string(), value);
            }
            Err(e) => {
                tracing::warn!(cache_key, error = %e, "Failed to encode collection");
                return;
            }
        }

        if let Err(e) = self.write_slot(&blob) {
            tracing::warn!(slot = %self.slot, cache_key, error = %e, "Failed to persist collection");
        }
    }

    fn read_slot(&self) -> Result<Option<Map<String, Value>>, StorageError> {
        match self.backend.get(&self.slot)? {
            Some(content) => Ok(Some(serde_json::from_str(&content)?)),
            None => Ok(None),
        }
    }

    fn write_slot(&self, blob: &Map<String, Value>) -> Result<(), StorageError> {
        let content = serde_json::to_string(blob)?;
        self.backend.set(&self.slot, &content)?;
        Ok(())
    }
}

impl std::fmt::Debug for PersistentCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentCache").field("slot", &self.slot).finish()
    }
}
