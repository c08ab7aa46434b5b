//! Canonical chain head tracking.

use super::{events::EventMux, ChainError, NodeEvent};
use crate::{
    chainspec::Genesis,
    storage::{schema, ChainDatabase},
};
use alloy_primitives::B256;
use parking_lot::RwLock;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tracing::{debug, info, warn};

/// Number and hash of the current head block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainHead {
    /// Block number.
    pub number: u64,
    /// Block hash.
    pub hash: B256,
}

/// Canonical chain operations the node needs.
pub trait BlockChain: Send + Sync {
    /// Current head block.
    fn head(&self) -> ChainHead;

    /// Rewinds the canonical chain to `number`. Heights above the head are ignored.
    fn set_head(&self, number: u64) -> Result<(), ChainError>;

    /// Wipes the chain and re-initialises it from `genesis`.
    fn reset_with_genesis_block(&self, genesis: &Genesis) -> Result<(), ChainError>;

    /// Stops background processing.
    fn stop(&self);
}

/// Chain keeping only canonical hashes, backed by the chain database.
pub struct MemoryChain {
    db: Arc<dyn ChainDatabase>,
    head: RwLock<ChainHead>,
    events: Arc<EventMux>,
    stopped: AtomicBool,
}

impl std::fmt::Debug for MemoryChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryChain").field("head", &*self.head.read()).finish_non_exhaustive()
    }
}

impl MemoryChain {
    /// Loads the head from `db`. The genesis must already be committed.
    pub fn new(db: Arc<dyn ChainDatabase>, events: Arc<EventMux>) -> Result<Self, ChainError> {
        let number = schema::read_head_number(db.as_ref())?.ok_or(ChainError::UnknownBlock(0))?;
        let hash = schema::read_head_hash(db.as_ref())?.ok_or(ChainError::UnknownBlock(number))?;
        debug!(target: "chain", number, %hash, "Loaded chain head");
        Ok(Self { db, head: RwLock::new(ChainHead { number, hash }), events, stopped: AtomicBool::new(false) })
    }

    /// Appends a block on top of the head.
    pub fn insert_block(&self, number: u64, hash: B256) -> Result<(), ChainError> {
        if self.is_stopped() {
            return Err(ChainError::Stopped);
        }
        let mut head = self.head.write();
        if number != head.number + 1 {
            return Err(ChainError::NotHeadChild { number, head: head.number });
        }
        schema::write_canonical_hash(self.db.as_ref(), number, hash)?;
        schema::write_head_block(self.db.as_ref(), number, hash)?;
        *head = ChainHead { number, hash };
        drop(head);

        self.events.post(NodeEvent::ChainHead { number, hash });
        Ok(())
    }

    /// Whether [`BlockChain::stop`] was called.
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    fn truncate_above(&self, number: u64, head: u64) -> Result<(), ChainError> {
        for height in (number + 1)..=head {
            schema::delete_canonical_hash(self.db.as_ref(), height)?;
        }
        Ok(())
    }
}

impl BlockChain for MemoryChain {
    fn head(&self) -> ChainHead {
        *self.head.read()
    }

    fn set_head(&self, number: u64) -> Result<(), ChainError> {
        let mut head = self.head.write();
        if number >= head.number {
            return Ok(());
        }
        let hash = schema::read_canonical_hash(self.db.as_ref(), number)?
            .ok_or(ChainError::UnknownBlock(number))?;
        warn!(target: "chain", from = head.number, to = number, "Rewinding blockchain");

        self.truncate_above(number, head.number)?;
        schema::write_head_block(self.db.as_ref(), number, hash)?;
        *head = ChainHead { number, hash };
        Ok(())
    }

    fn reset_with_genesis_block(&self, genesis: &Genesis) -> Result<(), ChainError> {
        let mut head = self.head.write();
        self.truncate_above(0, head.number)?;
        let hash = genesis.commit(self.db.as_ref())?;
        *head = ChainHead { number: 0, hash };
        info!(target: "chain", %hash, "Reset chain to genesis");
        Ok(())
    }

    fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        debug!(target: "chain", "Blockchain stopped");
    }
}
