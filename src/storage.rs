//! Whole-value key-value storage used as the backing slot of the review store.
//!
//! The store only needs `get` and `set` over string values, which is the
//! contract offered by platform preference stores and browser-style local
//! storage alike. [`MemoryStorage`] is the in-process medium used in tests
//! and for ephemeral sessions; [`LmdbStorage`](crate::lmdb_storage::LmdbStorage)
//! persists to disk.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::StorageError;

/// A storage medium addressed by string keys with whole-value semantics.
pub trait KeyValueStorage {
    /// Returns the value stored under `key`, or `None` if the slot is absent.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replaces the value stored under `key`. Either the whole value is
    /// written or the slot is left untouched.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStorage + ?Sized> KeyValueStorage for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }
}

/// In-memory storage, optionally limited to a byte quota across all slots.
///
/// Clones share the same underlying map, so two stores built over clones of
/// one `MemoryStorage` behave like two tabs sharing local storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    slots: Arc<RwLock<HashMap<String, String>>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage that rejects writes once keys and values exceed `bytes` in total.
    pub fn with_quota(bytes: usize) -> Self {
        MemoryStorage {
            slots: Arc::default(),
            quota: Some(bytes),
        }
    }

    /// Removes a slot, as if the user cleared the app's data.
    pub fn remove(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned during remove".into()))?;
        Ok(slots.remove(key))
    }
}

impl KeyValueStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let slots = self
            .slots
            .read()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned during read".into()))?;
        Ok(slots.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| StorageError::Unavailable("storage lock poisoned during write".into()))?;

        if let Some(quota) = self.quota {
            let others: usize = slots
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = others + key.len() + value.len();
            if needed > quota {
                return Err(StorageError::QuotaExceeded(format!(
                    "writing {} bytes to '{key}' needs {needed} of {quota} bytes",
                    value.len()
                )));
            }
        }

        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
