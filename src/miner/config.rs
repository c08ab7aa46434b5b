//! Miner configuration.

use alloy_primitives::{Address, Bytes};
use std::time::Duration;

/// Default recommit interval (2 seconds).
pub const DEFAULT_RECOMMIT_INTERVAL: Duration = Duration::from_secs(2);

/// Default gas ceiling.
pub const DEFAULT_GAS_CEIL: u64 = 8_000_000;

/// Default minimum gas price (18 gwei).
pub const DEFAULT_GAS_PRICE: u128 = 18_000_000_000;

/// Maximum extra-data a miner may put into a header.
pub const MAXIMUM_EXTRA_DATA_SIZE: usize = 32;

/// Miner configuration.
#[derive(Debug, Clone)]
pub struct MinerConfig {
    /// Gas ceiling for blocks.
    pub gas_ceil: u64,

    /// Minimum gas price to accept transactions.
    pub gas_price: u128,

    /// Extra data (vanity) to include in blocks.
    pub extra_data: Bytes,

    /// Interval for recommitting (rebuilding work on the current head).
    pub recommit_interval: Duration,

    /// Beneficiary of mined blocks.
    pub etherbase: Address,
}

impl Default for MinerConfig {
    fn default() -> Self {
        Self {
            gas_ceil: DEFAULT_GAS_CEIL,
            gas_price: DEFAULT_GAS_PRICE,
            extra_data: Bytes::default(),
            recommit_interval: DEFAULT_RECOMMIT_INTERVAL,
            etherbase: Address::ZERO,
        }
    }
}

impl MinerConfig {
    /// Create a new miner configuration.
    pub fn new(etherbase: Address) -> Self {
        Self { etherbase, ..Default::default() }
    }

    /// Set gas ceiling.
    pub fn with_gas_ceil(mut self, gas_ceil: u64) -> Self {
        self.gas_ceil = gas_ceil;
        self
    }

    /// Set minimum gas price.
    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Set extra data (vanity).
    pub fn with_extra_data(mut self, extra_data: Bytes) -> Self {
        self.extra_data = extra_data;
        self
    }

    /// Set recommit interval.
    pub fn with_recommit_interval(mut self, interval: Duration) -> Self {
        self.recommit_interval = interval;
        self
    }
}
