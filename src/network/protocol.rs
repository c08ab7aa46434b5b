//! `eth` protocol manager.

use super::{Protocol, SyncMode};
use crate::chain::{BlockChain, TxPool};
use alloy_primitives::B256;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use tracing::{debug, info, trace};

/// Name of the full-node protocol.
pub const ETH_PROTOCOL_NAME: &str = "eth";

/// Supported `eth` versions with their message counts, newest first.
pub const ETH_VERSIONS: [(u32, u64); 2] = [(63, 17), (62, 8)];

/// Handler of the full-node wire protocol.
pub trait ProtocolManager: Send + Sync {
    /// Sub-protocols offered to peers, newest first.
    fn protocols(&self) -> Vec<Protocol>;

    /// Starts serving with at most `max_peers` peers.
    fn start(&self, max_peers: usize);

    /// Stops serving and disconnects peers.
    fn stop(&self);

    /// Handles a transaction announcement. Returns how many entered the pool.
    fn handle_transactions(&self, hashes: &[B256]) -> usize;
}

/// Protocol manager admitting transactions once the node is synced.
pub struct EthProtocolManager {
    network_id: u64,
    protocols: Vec<Protocol>,
    chain: Arc<dyn BlockChain>,
    tx_pool: Arc<dyn TxPool>,
    accept_txs: Arc<AtomicBool>,
    max_peers: AtomicUsize,
    running: AtomicBool,
}

impl std::fmt::Debug for EthProtocolManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EthProtocolManager")
            .field("network_id", &self.network_id)
            .field("protocols", &self.protocols)
            .field("accept_txs", &self.accept_txs.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl EthProtocolManager {
    /// Create a manager for `network_id`.
    ///
    /// Fast sync needs state download, so `eth/62` is not offered in that mode.
    /// `accept_txs` is shared with the node, which raises it when local mining
    /// starts.
    pub fn new(
        network_id: u64,
        mode: SyncMode,
        chain: Arc<dyn BlockChain>,
        tx_pool: Arc<dyn TxPool>,
        accept_txs: Arc<AtomicBool>,
    ) -> Self {
        let protocols = ETH_VERSIONS
            .iter()
            .filter(|(version, _)| mode != SyncMode::Fast || *version >= 63)
            .map(|&(version, length)| Protocol { name: ETH_PROTOCOL_NAME, version, length })
            .collect();
        Self {
            network_id,
            protocols,
            chain,
            tx_pool,
            accept_txs,
            max_peers: AtomicUsize::new(0),
            running: AtomicBool::new(false),
        }
    }

    /// Network identifier.
    pub fn network_id(&self) -> u64 {
        self.network_id
    }

    /// Peer budget set on start.
    pub fn max_peers(&self) -> usize {
        self.max_peers.load(Ordering::Acquire)
    }

    /// Whether the manager is serving.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Whether transactions from peers are accepted.
    pub fn accepts_txs(&self) -> bool {
        self.accept_txs.load(Ordering::Acquire)
    }
}

impl ProtocolManager for EthProtocolManager {
    fn protocols(&self) -> Vec<Protocol> {
        self.protocols.clone()
    }

    fn start(&self, max_peers: usize) {
        self.max_peers.store(max_peers, Ordering::Release);
        self.running.store(true, Ordering::Release);
        info!(
            target: "network",
            network = self.network_id,
            max_peers,
            head = self.chain.head().number,
            "Started eth protocol manager"
        );
    }

    fn stop(&self) {
        self.running.store(false, Ordering::Release);
        debug!(target: "network", "Stopped eth protocol manager");
    }

    fn handle_transactions(&self, hashes: &[B256]) -> usize {
        if !self.is_running() || !self.accepts_txs() {
            trace!(target: "network", count = hashes.len(), "Dropping transactions, not accepting");
            return 0;
        }
        self.tx_pool.add_remotes(hashes)
    }
}
