//! Bloom-bit index over block headers.

use super::BlockChain;
use crate::storage::StorageError;
use alloy_primitives::Bytes;
use parking_lot::RwLock;
use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};
use tracing::debug;

/// Blocks per bloom-bit section.
pub const BLOOM_BITS_BLOCKS: u64 = 4096;

/// Bloom-bit index the node serves retrievals from.
pub trait BloomIndexer: Send + Sync {
    /// Starts indexing `chain` in the background.
    fn start(&self, chain: Arc<dyn BlockChain>);

    /// Number of fully indexed sections.
    fn sections(&self) -> u64;

    /// Compressed bit vector for `bit` in `section`.
    fn bloom_bits(&self, bit: u32, section: u64) -> Option<Bytes>;

    /// Stops indexing.
    fn close(&self) -> Result<(), StorageError>;
}

/// Index holding pre-computed sections in memory.
#[derive(Default)]
pub struct MemoryBloomIndexer {
    bits: RwLock<HashMap<(u32, u64), Bytes>>,
    chain: RwLock<Option<Arc<dyn BlockChain>>>,
    closed: AtomicBool,
}

impl std::fmt::Debug for MemoryBloomIndexer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryBloomIndexer")
            .field("entries", &self.bits.read().len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl MemoryBloomIndexer {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the bit vector for `bit` in `section`.
    pub fn insert(&self, bit: u32, section: u64, vector: Bytes) {
        self.bits.write().insert((bit, section), vector);
    }

    /// Whether indexing was started.
    pub fn is_started(&self) -> bool {
        self.chain.read().is_some()
    }

    /// Whether [`BloomIndexer::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

impl BloomIndexer for MemoryBloomIndexer {
    fn start(&self, chain: Arc<dyn BlockChain>) {
        debug!(target: "chain::bloom", head = chain.head().number, "Bloom indexer started");
        *self.chain.write() = Some(chain);
    }

    fn sections(&self) -> u64 {
        match self.chain.read().as_ref() {
            Some(chain) => chain.head().number / BLOOM_BITS_BLOCKS,
            None => 0,
        }
    }

    fn bloom_bits(&self, bit: u32, section: u64) -> Option<Bytes> {
        if self.is_closed() {
            return None;
        }
        self.bits.read().get(&(bit, section)).cloned()
    }

    fn close(&self) -> Result<(), StorageError> {
        self.closed.store(true, Ordering::Release);
        self.chain.write().take();
        debug!(target: "chain::bloom", "Bloom indexer closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        chain::{EventMux, MemoryChain},
        chainspec::setup_genesis,
        storage::MemoryDatabase,
    };

    #[test]
    fn test_lookup_and_close() {
        let indexer = MemoryBloomIndexer::new();
        indexer.insert(7, 0, Bytes::from_static(&[0xff]));

        assert_eq!(indexer.bloom_bits(7, 0), Some(Bytes::from_static(&[0xff])));
        assert_eq!(indexer.bloom_bits(7, 1), None);

        indexer.close().unwrap();
        assert!(indexer.is_closed());
        assert_eq!(indexer.bloom_bits(7, 0), None);
    }

    #[test]
    fn test_sections_follow_chain() {
        let db = MemoryDatabase::new_arc();
        setup_genesis(db.as_ref(), None).unwrap();
        let chain = Arc::new(MemoryChain::new(db, Arc::new(EventMux::new())).unwrap());

        let indexer = MemoryBloomIndexer::new();
        assert_eq!(indexer.sections(), 0);
        indexer.start(chain);
        assert!(indexer.is_started());
        assert_eq!(indexer.sections(), 0);
    }
}
