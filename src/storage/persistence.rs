//! Sled-backed persistence for client records

use std::io;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use sled::{Db, Tree};

use crate::error::StorageError;
use crate::storage::watch::StorageWatcher;

const TREE_RECORDS: &str = "local_storage";

/// Handle to the shared record store.
///
/// Clones share the same underlying database, so two clones behave like two
/// browser tabs of the same origin.
#[derive(Clone)]
pub struct Storage {
    db: Db,
    records: Tree,
}

impl Storage {
    /// Open (or create) the store at the given directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let db = sled::open(path).map_err(|e| {
            StorageError::IoError(io::Error::new(
                io::ErrorKind::Other,
                format!("Failed to open sled database: {}", e),
            ))
        })?;
        Self::from_db(db)
    }

    /// In-memory store that disappears when the last handle is dropped
    pub fn temporary() -> Result<Self, StorageError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(to_storage_io)?;
        Self::from_db(db)
    }

    pub fn from_db(db: Db) -> Result<Self, StorageError> {
        let records = db.open_tree(TREE_RECORDS).map_err(to_storage_io)?;
        Ok(Self { db, records })
    }

    /// Get the underlying sled database
    pub fn db(&self) -> &Db {
        &self.db
    }

    pub fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        validate_key(key)?;
        let value = self.records.get(key.as_bytes()).map_err(to_storage_io)?;
        Ok(value.map(|v| v.to_vec()))
    }

    pub fn set_raw(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        validate_key(key)?;
        self.records
            .insert(key.as_bytes(), value)
            .map_err(to_storage_io)?;
        Ok(())
    }

    /// Read and deserialize a JSON record.
    ///
    /// A record that exists but fails to parse yields [`StorageError::CorruptRecord`].
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, StorageError> {
        let Some(raw) = self.get_raw(key)? else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&raw).map_err(|e| StorageError::CorruptRecord {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Some(parsed))
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let encoded = serde_json::to_vec(value).map_err(to_storage_data)?;
        self.set_raw(key, &encoded)
    }

    /// Remove a record. Returns whether anything was removed.
    pub fn remove(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        let previous = self.records.remove(key.as_bytes()).map_err(to_storage_io)?;
        Ok(previous.is_some())
    }

    pub fn contains(&self, key: &str) -> Result<bool, StorageError> {
        validate_key(key)?;
        self.records
            .contains_key(key.as_bytes())
            .map_err(to_storage_io)
    }

    /// Byte length of the stored value, 0 when absent
    pub fn value_len(&self, key: &str) -> Result<usize, StorageError> {
        Ok(self.get_raw(key)?.map(|v| v.len()).unwrap_or(0))
    }

    /// Keys starting with `prefix`, in lexicographic order
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        for item in self.records.scan_prefix(prefix.as_bytes()) {
            let (key, _) = item.map_err(to_storage_io)?;
            keys.push(String::from_utf8_lossy(&key).into_owned());
        }
        Ok(keys)
    }

    /// Subscribe to changes under a key prefix
    pub fn watch(&self, prefix: &str) -> StorageWatcher {
        StorageWatcher::new(self.records.watch_prefix(prefix.as_bytes()))
    }

    /// Flush all pending writes to disk
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush().map_err(to_storage_io)?;
        Ok(())
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key cannot be empty".to_string()));
    }
    Ok(())
}

fn to_storage_io(err: sled::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::Other, err.to_string()))
}

fn to_storage_data(err: serde_json::Error) -> StorageError {
    StorageError::IoError(io::Error::new(io::ErrorKind::InvalidData, err.to_string()))
}
