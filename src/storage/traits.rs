//! Storage traits for the chain database.
//!
//! The node only needs a flat key-value view of the database. Typed records
//! live in [`schema`](super::schema).

use parking_lot::Mutex;
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::JoinHandle,
};

/// Error type for chain database operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The database was closed.
    #[error("database closed")]
    Closed,

    /// A stored value could not be decoded.
    #[error("corrupted record {key}: {reason}")]
    Corrupted {
        /// Human readable key.
        key: String,
        /// Decoding failure.
        reason: String,
    },

    /// The backend failed.
    #[error("database error: {0}")]
    Backend(String),

    /// A value could not be encoded.
    #[error("encoding error: {0}")]
    Encoding(String),
}

/// Flat key-value access to the chain database.
pub trait ChainDatabase: Send + Sync {
    /// Reads the value stored under `key`.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError>;

    /// Removes `key`.
    fn delete(&self, key: &[u8]) -> Result<(), StorageError>;

    /// Checks if `key` is present.
    fn has(&self, key: &[u8]) -> Result<bool, StorageError> {
        Ok(self.get(key)?.is_some())
    }

    /// Starts any pending background schema upgrade.
    ///
    /// The returned handle must be stopped before the database is closed.
    fn start_upgrade(&self) -> Option<UpgradeHandle> {
        None
    }

    /// Closes the database. Later operations fail with [`StorageError::Closed`].
    fn close(&self);
}

/// Opens named databases, e.g. `chaindata`, inside the node's data directory.
pub trait DatabaseOpener: Send + Sync {
    /// Opens (or creates) the database called `name`.
    fn open_database(
        &self,
        name: &str,
        cache_mb: usize,
        handles: usize,
    ) -> Result<Arc<dyn ChainDatabase>, StorageError>;
}

/// Handle to a background upgrade running on its own thread.
///
/// The upgrade step is invoked repeatedly until it reports completion, fails,
/// or [`UpgradeHandle::stop`] is called.
#[derive(Debug)]
pub struct UpgradeHandle {
    interrupt: Arc<AtomicBool>,
    thread: Mutex<Option<JoinHandle<Result<(), StorageError>>>>,
}

impl UpgradeHandle {
    /// Spawns `step` on a dedicated thread. `step` returns `Ok(true)` when done.
    pub fn spawn<F>(name: &str, mut step: F) -> Result<Self, StorageError>
    where
        F: FnMut() -> Result<bool, StorageError> + Send + 'static,
    {
        let interrupt = Arc::new(AtomicBool::new(false));
        let flag = interrupt.clone();
        let thread = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                while !flag.load(Ordering::Acquire) {
                    if step()? {
                        break;
                    }
                }
                Ok(())
            })
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Ok(Self { interrupt, thread: Mutex::new(Some(thread)) })
    }

    /// Interrupts the upgrade and waits for the thread to exit.
    pub fn stop(&self) -> Result<(), StorageError> {
        self.interrupt.store(true, Ordering::Release);
        match self.thread.lock().take() {
            Some(thread) => thread
                .join()
                .map_err(|_| StorageError::Backend("upgrade thread panicked".to_string()))?,
            None => Ok(()),
        }
    }
}

impl Drop for UpgradeHandle {
    fn drop(&mut self) {
        self.interrupt.store(true, Ordering::Release);
    }
}
