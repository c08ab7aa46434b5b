//! Light client server (`les`).

use super::{NetworkServer, Protocol};
use crate::chain::BloomIndexer;
use parking_lot::RwLock;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, info};

/// Name of the light-client protocol.
pub const LES_PROTOCOL_NAME: &str = "les";

/// Served `les` versions with their message counts.
pub const LES_VERSIONS: [(u32, u64); 1] = [(2, 22)];

/// Server side of the light-client protocol.
pub trait LightServer: Send + Sync {
    /// Sub-protocols offered to light peers.
    fn protocols(&self) -> Vec<Protocol>;

    /// Starts serving on `server`.
    fn start(&self, server: &NetworkServer);

    /// Stops serving.
    fn stop(&self);

    /// Bloom index used to answer log filter requests.
    fn set_bloom_indexer(&self, indexer: Arc<dyn BloomIndexer>);
}

/// Light server answering from the node's own indexes.
#[derive(Default)]
pub struct LesServer {
    bloom: RwLock<Option<Arc<dyn BloomIndexer>>>,
    running: AtomicBool,
}

impl std::fmt::Debug for LesServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LesServer")
            .field("has_bloom_indexer", &self.has_bloom_indexer())
            .field("running", &self.is_running())
            .finish()
    }
}

impl LesServer {
    /// Create a stopped server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the server is serving.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether a bloom index was attached.
    pub fn has_bloom_indexer(&self) -> bool {
        self.bloom.read().is_some()
    }
}

impl LightServer for LesServer {
    fn protocols(&self) -> Vec<Protocol> {
        LES_VERSIONS
            .iter()
            .map(|&(version, length)| Protocol { name: LES_PROTOCOL_NAME, version, length })
            .collect()
    }

    fn start(&self, server: &NetworkServer) {
        self.running.store(true, Ordering::Release);
        info!(target: "network::les", max_peers = server.max_peers, "Started light server");
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        debug!(target: "network::les", "Stopped light server");
    }

    fn set_bloom_indexer(&self, indexer: Arc<dyn BloomIndexer>) {
        *self.bloom.write() = Some(indexer);
    }
}
