//! Resources the node host hands to services.

use crate::{
    accounts::AccountManager,
    consensus::SharedEthash,
    storage::{ChainDatabase, DatabaseOpener, StorageError},
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::debug;

/// Host-provided environment of a [`FullNode`](super::FullNode).
#[derive(Clone)]
pub struct ServiceContext {
    data_dir: Option<PathBuf>,
    databases: Arc<dyn DatabaseOpener>,
    accounts: Arc<dyn AccountManager>,
    shared_ethash: Arc<SharedEthash>,
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext").field("data_dir", &self.data_dir).finish_non_exhaustive()
    }
}

impl ServiceContext {
    /// Create an ephemeral context: relative paths are used as given.
    pub fn new(databases: Arc<dyn DatabaseOpener>, accounts: Arc<dyn AccountManager>) -> Self {
        Self {
            data_dir: None,
            databases,
            accounts,
            shared_ethash: Arc::new(SharedEthash::new()),
        }
    }

    /// Anchor relative paths at `data_dir`.
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(data_dir.into());
        self
    }

    /// Use an existing shared ethash factory, so several nodes in one process
    /// share the engine.
    pub fn with_shared_ethash(mut self, shared: Arc<SharedEthash>) -> Self {
        self.shared_ethash = shared;
        self
    }

    /// Data directory, if the node is not ephemeral.
    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }

    /// Resolves `path` against the data directory. Absolute paths and
    /// ephemeral nodes keep the path unchanged.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.data_dir {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Opens the database called `name`.
    pub fn open_database(
        &self,
        name: &str,
        cache_mb: usize,
        handles: usize,
    ) -> Result<Arc<dyn ChainDatabase>, StorageError> {
        debug!(target: "node", name, cache_mb, handles, "Opening database");
        self.databases.open_database(name, cache_mb, handles)
    }

    /// Account manager of the host.
    pub fn account_manager(&self) -> &Arc<dyn AccountManager> {
        &self.accounts
    }

    /// Factory of the process-wide shared ethash engine.
    pub fn shared_ethash(&self) -> &SharedEthash {
        &self.shared_ethash
    }
}
