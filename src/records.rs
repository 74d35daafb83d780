//! Small persisted blobs (reminder log, daily stats).
//!
//! Each record is written as a whole on every save; there is no partial
//! merge, so the last writer always leaves a complete record behind.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub const NOTIFIED_REMINDERS_KEY: &str = "notified_reminders";
pub const DAILY_STATS_KEY: &str = "daily_stats";

#[derive(thiserror::Error, Debug)]
pub enum PersistError {
    #[error("reading or writing record {key}: {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encoding record {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("record store is unavailable")]
    Unavailable,
}

pub trait RecordStore: Send + Sync {
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistError>;
    fn save_raw(&self, key: &str, value: &str) -> Result<(), PersistError>;
}

pub fn load<T: DeserializeOwned>(
    store: &dyn RecordStore,
    key: &str,
) -> Result<Option<T>, PersistError> {
    match store.load_raw(key)? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| PersistError::Encode {
                key: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

pub fn save<T: Serialize>(store: &dyn RecordStore, key: &str, value: &T) -> Result<(), PersistError> {
    let raw = serde_json::to_string(value).map_err(|source| PersistError::Encode {
        key: key.to_string(),
        source,
    })?;
    store.save_raw(key, &raw)
}

/// One `<key>.json` file per record inside a data directory.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileRecordStore { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl RecordStore for FileRecordStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistError> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|source| PersistError::Io {
                key: key.to_string(),
                source,
            })
    }

    fn save_raw(&self, key: &str, value: &str) -> Result<(), PersistError> {
        let io_err = |source| PersistError::Io {
            key: key.to_string(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_err)?;
        // Write beside the target then rename, so a crash mid-write never
        // leaves half a record.
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value).map_err(io_err)?;
        fs::rename(&tmp, &path).map_err(io_err)
    }
}

#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<HashMap<String, String>>,
    fail_writes: Mutex<bool>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent save fail until switched back.
    pub fn fail_writes(&self, fail: bool) {
        if let Ok(mut flag) = self.fail_writes.lock() {
            *flag = fail;
        }
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.records.lock().ok()?.get(key).cloned()
    }
}

impl RecordStore for MemoryRecordStore {
    fn load_raw(&self, key: &str) -> Result<Option<String>, PersistError> {
        let records = self.records.lock().map_err(|_| PersistError::Unavailable)?;
        Ok(records.get(key).cloned())
    }

    fn save_raw(&self, key: &str, value: &str) -> Result<(), PersistError> {
        if self.fail_writes.lock().map(|f| *f).unwrap_or(false) {
            return Err(PersistError::Unavailable);
        }
        let mut records = self.records.lock().map_err(|_| PersistError::Unavailable)?;
        records.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
