//! Node component builders.
//!
//! [`FullNode::new`](super::FullNode::new) does not construct its
//! collaborators directly. It asks a [`NodeComponents`] implementation for
//! each of them, so hosts can swap in real storage-backed subsystems while
//! tests and the development binary use [`MemoryComponents`].
//!
//! # Component Builders
//!
//! - **Blockchain**: canonical chain on top of the chain database
//! - **Bloom indexer**: log search index, attached to the chain
//! - **Transaction pool**: admission with the configured gas price
//! - **Protocol manager**: `eth` wire protocol (sub-protocols, peers)
//! - **Miner**: block production driven by the consensus engine

use super::NodeError;
use crate::{
    chain::{
        BlockChain, BloomIndexer, EventMux, MemoryBloomIndexer, MemoryChain, MemoryTxPool, TxPool,
    },
    chainspec::ForkSchedule,
    consensus::Engine,
    miner::{Miner, MinerConfig, MinerEvent, Worker},
    network::{EthProtocolManager, ProtocolManager, SyncMode},
    storage::ChainDatabase,
};
use std::{
    path::PathBuf,
    sync::{atomic::AtomicBool, Arc},
};
use tracing::{debug, info, warn};

/// Builds the collaborators of a full node.
pub trait NodeComponents: Send + Sync {
    /// Canonical chain on top of `db`. The genesis is already committed.
    fn create_blockchain(
        &self,
        db: Arc<dyn ChainDatabase>,
        config: &ForkSchedule,
        engine: &Engine,
        events: Arc<EventMux>,
    ) -> Result<Arc<dyn BlockChain>, NodeError>;

    /// Bloom indexer over `db`. The node starts it.
    fn create_bloom_indexer(&self, db: Arc<dyn ChainDatabase>) -> Arc<dyn BloomIndexer>;

    /// Transaction pool admitting at `gas_price` and journaling to `journal`.
    fn create_tx_pool(
        &self,
        gas_price: u128,
        journal: Option<PathBuf>,
        chain: Arc<dyn BlockChain>,
    ) -> Arc<dyn TxPool>;

    /// Manager of the `eth` protocol. `accept_txs` is shared with the node.
    #[allow(clippy::too_many_arguments)]
    fn create_protocol_manager(
        &self,
        config: &ForkSchedule,
        mode: SyncMode,
        network_id: u64,
        engine: &Engine,
        chain: Arc<dyn BlockChain>,
        tx_pool: Arc<dyn TxPool>,
        accept_txs: Arc<AtomicBool>,
    ) -> Result<Arc<dyn ProtocolManager>, NodeError>;

    /// Local miner.
    fn create_miner(
        &self,
        config: MinerConfig,
        engine: Engine,
        chain: Arc<dyn BlockChain>,
        events: Arc<EventMux>,
    ) -> Arc<dyn Miner>;
}

/// Components keeping all state in memory.
///
/// The miner is a spawned [`Worker`], so this must be used inside a tokio
/// runtime.
#[derive(Debug, Default, Clone, Copy)]
#[non_exhaustive]
pub struct MemoryComponents;

impl NodeComponents for MemoryComponents {
    fn create_blockchain(
        &self,
        db: Arc<dyn ChainDatabase>,
        config: &ForkSchedule,
        engine: &Engine,
        events: Arc<EventMux>,
    ) -> Result<Arc<dyn BlockChain>, NodeError> {
        let chain = MemoryChain::new(db, events)?;
        info!(
            target: "node",
            chain_id = ?config.chain_id,
            engine = engine.name(),
            head = chain.head().number,
            "Blockchain initialized"
        );
        Ok(Arc::new(chain))
    }

    fn create_bloom_indexer(&self, _db: Arc<dyn ChainDatabase>) -> Arc<dyn BloomIndexer> {
        Arc::new(MemoryBloomIndexer::new())
    }

    fn create_tx_pool(
        &self,
        gas_price: u128,
        journal: Option<PathBuf>,
        _chain: Arc<dyn BlockChain>,
    ) -> Arc<dyn TxPool> {
        debug!(target: "txpool", gas_price, ?journal, "Transaction pool initialized");
        Arc::new(MemoryTxPool::new(gas_price, journal))
    }

    fn create_protocol_manager(
        &self,
        _config: &ForkSchedule,
        mode: SyncMode,
        network_id: u64,
        _engine: &Engine,
        chain: Arc<dyn BlockChain>,
        tx_pool: Arc<dyn TxPool>,
        accept_txs: Arc<AtomicBool>,
    ) -> Result<Arc<dyn ProtocolManager>, NodeError> {
        Ok(Arc::new(EthProtocolManager::new(network_id, mode, chain, tx_pool, accept_txs)))
    }

    fn create_miner(
        &self,
        config: MinerConfig,
        engine: Engine,
        chain: Arc<dyn BlockChain>,
        events: Arc<EventMux>,
    ) -> Arc<dyn Miner> {
        let (handle, mut event_rx) = Worker::spawn(config, engine, chain, events);

        // Sealed work has no importer here, so events are only logged.
        tokio::spawn(async move {
            while let Some(event) = event_rx.recv().await {
                match event {
                    MinerEvent::BlockSealed { number, seal_hash, signer } => {
                        info!(target: "miner::worker", number, %seal_hash, %signer, "Sealed new block");
                    }
                    MinerEvent::Error(err) => {
                        warn!(target: "miner::worker", %err, "Mining error");
                    }
                    other => debug!(target: "miner::worker", ?other, "Miner event"),
                }
            }
        });

        Arc::new(handle)
    }
}
