//! The full node service.
//!
//! [`FullNode`] bootstraps the chain from a [`NodeConfig`], wires the
//! collaborators built by a [`NodeComponents`] implementation and runs them
//! as one network [`Service`].
//!
//! ```text
//!  NodeConfig ─┐
//!              ├─► FullNode::new ─► open chaindata ─► setup_genesis ─► engine
//!  ServiceContext                        │
//!                                        ├─► version check ─► blockchain ─► compat rewind
//!                                        └─► bloom indexer ─► tx pool ─► protocol manager ─► miner
//!
//!  start: bloom handlers ─► peer split ─► protocol manager ─► light server
//!  stop:  upgrade ─► bloom ─► chain ─► protocols ─► light ─► pool ─► miner ─► events ─► db ─► shutdown
//! ```

mod api;
mod bloom;
mod components;
mod config;
mod context;
mod extra;
mod service;
mod shutdown;

pub use api::{
    AdminApi, DebugApi, EthApi, MinerApi, NetApi, PrivateDebugApi, PublicMinerApi, RpcApi,
};
pub use bloom::{BloomRetrieval, BLOOM_RETRIEVAL_QUEUE, BLOOM_SERVICE_THREADS};
pub use components::{MemoryComponents, NodeComponents};
pub use config::NodeConfig;
pub use context::ServiceContext;
pub use extra::make_extra_data;
pub use service::{FullNode, NodeState, Service};
pub use shutdown::{Shutdown, ShutdownSignal};

use crate::{
    accounts::AccountError, chain::ChainError, chainspec::GenesisError, miner::MinerError,
    network::InvalidSyncMode, storage::StorageError,
};

/// Errors raised while bootstrapping or operating the node.
#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    /// The full node cannot run in light sync mode.
    #[error("light sync is not supported by the full node, run a light client instead")]
    LightSync,

    /// Unknown sync mode name.
    #[error(transparent)]
    SyncMode(#[from] InvalidSyncMode),

    /// The database was written by an incompatible version.
    #[error("blockchain DB version mismatch ({have} / {want}), run with skip_bc_version_check to ignore")]
    VersionMismatch {
        /// Version found in the database.
        have: u64,
        /// Version this node writes.
        want: u64,
    },

    /// No beneficiary is set and no local account exists.
    #[error("etherbase must be explicitly specified")]
    NoEtherbase,

    /// Mining was requested without a beneficiary.
    #[error("etherbase missing: {0}")]
    EtherbaseMissing(#[source] Box<NodeError>),

    /// Clique mining was requested for an account with no local key.
    #[error("signer missing: {0}")]
    SignerMissing(#[source] AccountError),

    /// The operation is not valid in the current lifecycle state.
    #[error("cannot {op} node in {state:?} state")]
    InvalidLifecycle {
        /// Attempted operation.
        op: &'static str,
        /// State the node was in.
        state: NodeState,
    },

    /// Genesis handling failed.
    #[error(transparent)]
    Genesis(#[from] GenesisError),

    /// Chain operation failed.
    #[error(transparent)]
    Chain(#[from] ChainError),

    /// Miner rejected a command.
    #[error(transparent)]
    Miner(#[from] MinerError),

    /// Database access failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration file could not be read.
    #[error("config io error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file could not be parsed.
    #[error("invalid config: {0}")]
    Json(#[from] serde_json::Error),
}
