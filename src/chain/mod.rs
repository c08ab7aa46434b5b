//! Chain-side collaborators of the node.
//!
//! The block processor, transaction pool, event multiplexer and bloom indexer
//! are separate subsystems; the node only starts, wires and stops them. Each is
//! a trait here with an in-memory implementation used by tests and by the
//! development binary.

mod blockchain;
mod bloom;
mod events;
mod txpool;

pub use blockchain::{BlockChain, ChainHead, MemoryChain};
pub use bloom::{BloomIndexer, MemoryBloomIndexer, BLOOM_BITS_BLOCKS};
pub use events::{EventMux, NodeEvent};
pub use txpool::{MemoryTxPool, TxPool};

use crate::{chainspec::GenesisError, storage::StorageError};

/// Errors raised by the chain subsystems.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// No canonical block at the height.
    #[error("unknown canonical block {0}")]
    UnknownBlock(u64),

    /// A block does not extend the current head.
    #[error("block {number} does not extend head {head}")]
    NotHeadChild {
        /// Number of the rejected block.
        number: u64,
        /// Current head number.
        head: u64,
    },

    /// The chain was stopped.
    #[error("blockchain stopped")]
    Stopped,

    /// Genesis handling failed.
    #[error(transparent)]
    Genesis(#[from] GenesisError),

    /// Database access failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
