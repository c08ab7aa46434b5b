//! Miner Module
//!
//! Local block production. The node only starts and stops it, and forwards
//! beneficiary and extra-data changes.
//!
//! # Modules
//!
//! - [`config`]: Miner configuration (gas ceiling, recommit interval, etc.)
//! - [`error`]: Error types for mining operations
//! - [`worker`]: Main mining loop with recommit support
//!
//! # Usage
//!
//! ```ignore
//! use n42_fullnode::miner::{Miner, MinerConfig, Worker};
//!
//! let config = MinerConfig::new(etherbase).with_recommit_interval(Duration::from_secs(2));
//! let (handle, event_rx) = Worker::spawn(config, engine, chain, events);
//!
//! handle.start(etherbase);
//! while let Some(event) = event_rx.recv().await {
//!     if let MinerEvent::BlockSealed { number, .. } = event { /* broadcast */ }
//! }
//! ```

mod config;
mod error;
mod worker;

pub use config::{
    MinerConfig, DEFAULT_GAS_CEIL, DEFAULT_GAS_PRICE, DEFAULT_RECOMMIT_INTERVAL,
    MAXIMUM_EXTRA_DATA_SIZE,
};
pub use error::{MinerError, MinerResult};
pub use worker::{MinerCommand, MinerEvent, MinerHandle, Worker};

use alloy_primitives::{Address, Bytes};

/// Control surface of the local miner.
pub trait Miner: Send + Sync {
    /// Starts producing blocks for `etherbase`.
    fn start(&self, etherbase: Address);

    /// Stops producing blocks.
    fn stop(&self);

    /// Whether blocks are being produced.
    fn mining(&self) -> bool;

    /// Changes the beneficiary of future blocks.
    fn set_etherbase(&self, etherbase: Address);

    /// Changes the header extra-data of future blocks.
    fn set_extra(&self, extra: Bytes) -> MinerResult<()>;
}
