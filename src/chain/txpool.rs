//! Transaction pool.

use alloy_primitives::B256;
use parking_lot::RwLock;
use std::{
    collections::HashSet,
    path::PathBuf,
    sync::atomic::{AtomicBool, Ordering},
};
use tracing::debug;

/// Pool operations the node needs.
pub trait TxPool: Send + Sync {
    /// Adds remote transactions by hash. Returns how many were new.
    fn add_remotes(&self, hashes: &[B256]) -> usize;

    /// Number of pending transactions.
    fn pending(&self) -> usize;

    /// Minimum gas price for admission.
    fn gas_price(&self) -> u128;

    /// Updates the minimum gas price for admission.
    fn set_gas_price(&self, price: u128);

    /// Stops the pool, flushing the journal if any.
    fn stop(&self);
}

/// Pool keeping transaction hashes in memory.
#[derive(Debug)]
pub struct MemoryTxPool {
    journal: Option<PathBuf>,
    gas_price: RwLock<u128>,
    pending: RwLock<HashSet<B256>>,
    stopped: AtomicBool,
}

impl MemoryTxPool {
    /// Create an empty pool.
    pub fn new(gas_price: u128, journal: Option<PathBuf>) -> Self {
        Self {
            journal,
            gas_price: RwLock::new(gas_price),
            pending: RwLock::new(HashSet::new()),
            stopped: AtomicBool::new(false),
        }
    }

    /// Journal location of local transactions.
    pub fn journal(&self) -> Option<&PathBuf> {
        self.journal.as_ref()
    }

    /// Whether [`TxPool::stop`] was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}

impl TxPool for MemoryTxPool {
    fn add_remotes(&self, hashes: &[B256]) -> usize {
        if self.is_stopped() {
            return 0;
        }
        let mut pending = self.pending.write();
        hashes.iter().filter(|hash| pending.insert(**hash)).count()
    }

    fn pending(&self) -> usize {
        self.pending.read().len()
    }

    fn gas_price(&self) -> u128 {
        *self.gas_price.read()
    }

    fn set_gas_price(&self, price: u128) {
        *self.gas_price.write() = price;
        debug!(target: "txpool", price, "Updated gas price");
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        debug!(target: "txpool", journal = ?self.journal, "Transaction pool stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_remotes_dedups() {
        let pool = MemoryTxPool::new(1, None);
        let a = B256::repeat_byte(1);
        let b = B256::repeat_byte(2);

        assert_eq!(pool.add_remotes(&[a, b, a]), 2);
        assert_eq!(pool.add_remotes(&[a]), 0);
        assert_eq!(pool.pending(), 2);
    }

    #[test]
    fn test_stopped_pool_rejects() {
        let pool = MemoryTxPool::new(1, Some(PathBuf::from("transactions.rlp")));
        pool.stop();
        assert!(pool.is_stopped());
        assert_eq!(pool.add_remotes(&[B256::ZERO]), 0);
        assert_eq!(pool.journal(), Some(&PathBuf::from("transactions.rlp")));
    }

    #[test]
    fn test_gas_price() {
        let pool = MemoryTxPool::new(18_000_000_000, None);
        assert_eq!(pool.gas_price(), 18_000_000_000);
        pool.set_gas_price(1);
        assert_eq!(pool.gas_price(), 1);
    }
}
