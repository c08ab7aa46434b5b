//! In-memory chain database.
//!
//! This provides a simple in-memory implementation of [`ChainDatabase`]
//! for tests, the dev mode of the binary and ephemeral nodes.

use super::traits::{ChainDatabase, DatabaseOpener, StorageError};
use parking_lot::RwLock;
use std::{
    collections::{BTreeMap, HashMap},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

/// In-memory key-value store.
///
/// Uses a `BTreeMap` so iteration in tests is deterministic.
#[derive(Debug, Default)]
pub struct MemoryDatabase {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
    closed: AtomicBool,
}

impl MemoryDatabase {
    /// Create a new empty database.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new database wrapped in Arc.
    pub fn new_arc() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the database is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Whether [`ChainDatabase::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> Result<(), StorageError> {
        if self.is_closed() {
            return Err(StorageError::Closed);
        }
        Ok(())
    }
}

impl ChainDatabase for MemoryDatabase {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
        self.ensure_open()?;
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
        self.ensure_open()?;
        self.entries.write().remove(key);
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

/// Hands out one [`MemoryDatabase`] per name.
///
/// Reopening a name returns the same instance, so a node restarted on the same
/// opener sees the data written by its predecessor.
#[derive(Debug, Default)]
pub struct MemoryDatabaseOpener {
    databases: RwLock<HashMap<String, Arc<MemoryDatabase>>>,
}

impl MemoryDatabaseOpener {
    /// Create an opener with no databases.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the database called `name`, if it was opened before.
    pub fn database(&self, name: &str) -> Option<Arc<MemoryDatabase>> {
        self.databases.read().get(name).cloned()
    }
}

impl DatabaseOpener for MemoryDatabaseOpener {
    fn open_database(
        &self,
        name: &str,
        _cache_mb: usize,
        _handles: usize,
    ) -> Result<Arc<dyn ChainDatabase>, StorageError> {
        let mut databases = self.databases.write();
        let db = databases.entry(name.to_string()).or_insert_with(MemoryDatabase::new_arc);
        // A restarted node reopens a database its predecessor closed.
        db.closed.store(false, Ordering::Release);
        Ok(db.clone())
    }
}
