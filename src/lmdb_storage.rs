//! LMDB-backed storage slot.
//!
//! Each [`LmdbStorage`] owns an LMDB environment living in a `<name>.lmdb`
//! directory with a single named database. Values are written in one write
//! transaction per `set`, so a rejected write (for example when the memory map
//! is full) leaves the previous value intact.

use std::path::{Path, PathBuf};

use lmdb::{Database, DatabaseFlags, Environment, Transaction, WriteFlags};
use log::{debug, info, warn};

use crate::error::StorageError;
use crate::storage::KeyValueStorage;

const DB_NAME: &str = "slots";

/// Settings for opening an LMDB environment.
#[derive(Debug, Clone)]
pub struct LmdbConfig {
    pub path: PathBuf,
    /// Upper bound of the memory map, which caps the total data size.
    pub map_size: usize,
    pub max_dbs: u32,
}

impl LmdbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        LmdbConfig {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn map_size(mut self, bytes: usize) -> Self {
        self.map_size = bytes;
        self
    }

    /// Named databases the environment may hold. The slot database needs one.
    pub fn max_dbs(mut self, count: u32) -> Self {
        self.max_dbs = count.max(1);
        self
    }
}

impl Default for LmdbConfig {
    fn default() -> Self {
        LmdbConfig {
            path: PathBuf::from("wine_cellar.lmdb"),
            map_size: 10 * 1024 * 1024,
            max_dbs: 1,
        }
    }
}

pub struct LmdbStorage {
    env: Environment,
    db: Database,
    path: PathBuf,
}

impl LmdbStorage {
    /// Opens or creates the environment in `<name>.lmdb` with default settings.
    pub fn init(name: &str) -> Result<Self, StorageError> {
        Self::open(LmdbConfig::new(format!("{name}.lmdb")))
    }

    pub fn open(config: LmdbConfig) -> Result<Self, StorageError> {
        std::fs::create_dir_all(&config.path).map_err(|e| {
            StorageError::Unavailable(format!(
                "cannot create directory {}: {e}",
                config.path.display()
            ))
        })?;

        let env = Environment::new()
            .set_max_dbs(config.max_dbs)
            .set_map_size(config.map_size)
            .open(&config.path)?;
        let db = env.create_db(Some(DB_NAME), DatabaseFlags::empty())?;

        info!("LMDB environment opened at {}", config.path.display());

        Ok(LmdbStorage {
            env,
            db,
            path: config.path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flushes buffers to disk. Called before the handle is released so the
    /// next open sees every committed write.
    pub fn close_database(&self) -> Result<(), StorageError> {
        self.env.sync(true)?;
        info!("LMDB environment at {} synced and ready to close", self.path.display());
        Ok(())
    }
}

impl KeyValueStorage for LmdbStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let txn = self.env.begin_ro_txn()?;

        let value = match txn.get(self.db, &key) {
            Ok(bytes) => {
                let text = String::from_utf8(bytes.to_vec()).map_err(|e| {
                    StorageError::Unavailable(format!("value under '{key}' is not UTF-8: {e}"))
                })?;
                Some(text)
            }
            Err(lmdb::Error::NotFound) => None,
            Err(e) => return Err(e.into()),
        };

        txn.abort();
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut txn = self.env.begin_rw_txn()?;

        if let Err(e) = txn.put(self.db, &key, &value, WriteFlags::empty()) {
            warn!("LMDB rejected write of {} bytes under '{key}': {e}", value.len());
            txn.abort();
            return Err(e.into());
        }

        txn.commit()?;
        debug!("Stored {} bytes under '{key}'", value.len());
        Ok(())
    }
}
