//! Storage layout for taskflow
//!
//! # Directory Structure
//!
//! ```text
//! <data dir>/
//!   todos.json          # Collection file: schema version + documents
//!   todos.lock          # Exclusive lock taken by writers
//! ```
//!
//! The data dir defaults to the platform data directory (see
//! [`default_data_dir`]) and can be overridden by config or `--store-dir`.

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::lock::{self, FileLock};

/// Version tag written into every collection file
pub const COLLECTION_SCHEMA_VERSION: u32 = 1;

/// Platform data directory, `None` when no home directory can be found.
pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "taskflow", "taskflow").map(|dirs| dirs.data_dir().to_path_buf())
}

/// Storage manager for one data directory
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    lock_timeout_ms: u64,
}

impl Storage {
    pub fn new(root: PathBuf, lock_timeout_ms: u64) -> Self {
        Self {
            root,
            lock_timeout_ms,
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn collection_file(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.json"))
    }

    pub fn collection_lock_file(&self, collection: &str) -> PathBuf {
        self.root.join(format!("{collection}.lock"))
    }

    /// Create the data directory if missing
    pub fn init(&self) -> Result<()> {
        fs::create_dir_all(&self.root)?;
        Ok(())
    }

    // =========================================================================
    // File I/O helpers
    // =========================================================================

    /// Write JSON atomically (temp file + rename)
    pub fn write_json<T: Serialize>(&self, path: &Path, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        lock::write_atomic(path, json.as_bytes())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read JSON, or `T::default()` when the file does not exist yet
    pub fn read_json_or_default<T: DeserializeOwned + Default>(&self, path: &Path) -> Result<T> {
        if !path.exists() {
            return Ok(T::default());
        }
        self.read_json(path)
    }

    // =========================================================================
    // Locked read-modify-write
    // =========================================================================

    /// Run `f` over the collection contents while holding its lock, then
    /// persist the result atomically.
    pub fn update_collection<T, R, F>(&self, collection: &str, f: F) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default,
        F: FnOnce(&mut T) -> Result<R>,
    {
        self.init()?;
        let _lock = FileLock::acquire(
            self.collection_lock_file(collection),
            self.lock_timeout_ms,
        )?;

        let path = self.collection_file(collection);
        let mut data: T = self.read_json_or_default(&path)?;
        let result = f(&mut data)?;
        self.write_json(&path, &data)?;
        Ok(result)
    }

    /// Read the collection contents under its lock
    pub fn read_collection<T>(&self, collection: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        let path = self.collection_file(collection);
        if !path.exists() {
            return Ok(T::default());
        }
        let _lock = FileLock::acquire(
            self.collection_lock_file(collection),
            self.lock_timeout_ms,
        )?;
        self.read_json_or_default(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use tempfile::TempDir;

    #[derive(Debug, Default, Serialize, Deserialize, PartialEq)]
    struct Counter {
        value: u32,
    }

    #[test]
    fn collection_paths_live_under_root() {
        let storage = Storage::new(PathBuf::from("/data"), 100);
        assert_eq!(storage.collection_file("todos"), PathBuf::from("/data/todos.json"));
        assert_eq!(
            storage.collection_lock_file("todos"),
            PathBuf::from("/data/todos.lock")
        );
    }

    #[test]
    fn missing_collection_reads_as_default() {
        let temp = TempDir::new().expect("temp dir");
        let storage = Storage::new(temp.path().join("data"), 100);
        let counter: Counter = storage.read_collection("todos").expect("read");
        assert_eq!(counter, Counter::default());
        assert!(!storage.root().exists());
    }

    #[test]
    fn update_collection_persists_changes() {
        let temp = TempDir::new().expect("temp dir");
        let storage = Storage::new(temp.path().to_path_buf(), 1000);

        for _ in 0..3 {
            storage
                .update_collection("todos", |counter: &mut Counter| {
                    counter.value += 1;
                    Ok(())
                })
                .expect("update");
        }

        let counter: Counter = storage.read_collection("todos").expect("read");
        assert_eq!(counter.value, 3);
    }

    #[test]
    fn failed_update_leaves_file_untouched() {
        let temp = TempDir::new().expect("temp dir");
        let storage = Storage::new(temp.path().to_path_buf(), 1000);
        storage
            .update_collection("todos", |counter: &mut Counter| {
                counter.value = 7;
                Ok(())
            })
            .expect("seed");

        let result = storage.update_collection("todos", |counter: &mut Counter| {
            counter.value = 99;
            Err::<(), _>(crate::error::Error::NotFound("x".to_string()))
        });
        assert!(result.is_err());

        let counter: Counter = storage.read_collection("todos").expect("read");
        assert_eq!(counter.value, 7);
    }
}
