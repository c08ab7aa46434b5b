//! Node configuration.

use super::NodeError;
use crate::{
    chainspec::Genesis, consensus::ethash::EthashConfig, miner::DEFAULT_GAS_PRICE,
    network::SyncMode,
};
use alloy_primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default database cache in megabytes.
pub const DEFAULT_DATABASE_CACHE: usize = 768;

/// Default number of database file handles.
pub const DEFAULT_DATABASE_HANDLES: usize = 256;

/// Default maximum number of light peers.
pub const DEFAULT_LIGHT_PEERS: usize = 100;

/// Settings of a [`FullNode`](super::FullNode).
///
/// Loaded from JSON with camelCase keys; every field is optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
    /// Genesis to commit into an empty database. Mainnet when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub genesis: Option<Genesis>,

    /// Network identifier announced to peers.
    pub network_id: u64,

    /// Synchronisation mode.
    pub sync_mode: SyncMode,

    /// Percentage of peer slots given to light clients. Zero disables serving.
    pub light_serv: u32,

    /// Maximum number of light peers.
    pub light_peers: usize,

    /// Skip the database schema version check.
    pub skip_bc_version_check: bool,

    /// Database cache in megabytes.
    pub database_cache: usize,

    /// Database file handles.
    pub database_handles: usize,

    /// Beneficiary of mined blocks. Zero picks the first local account.
    pub etherbase: Address,

    /// Minimum gas price of pooled transactions.
    pub gas_price: u128,

    /// Header extra-data of mined blocks.
    pub extra_data: Bytes,

    /// Proof-of-work settings.
    pub ethash: EthashConfig,

    /// Transaction pool journal, relative to the data directory. Empty
    /// disables the journal.
    pub tx_pool_journal: PathBuf,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            genesis: None,
            network_id: 1,
            sync_mode: SyncMode::Fast,
            light_serv: 0,
            light_peers: DEFAULT_LIGHT_PEERS,
            skip_bc_version_check: false,
            database_cache: DEFAULT_DATABASE_CACHE,
            database_handles: DEFAULT_DATABASE_HANDLES,
            etherbase: Address::ZERO,
            gas_price: DEFAULT_GAS_PRICE,
            extra_data: Bytes::new(),
            ethash: EthashConfig::default(),
            tx_pool_journal: PathBuf::from("transactions.rlp"),
        }
    }
}

impl NodeConfig {
    /// Reads a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NodeError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Set the genesis.
    pub fn with_genesis(mut self, genesis: Genesis) -> Self {
        self.genesis = Some(genesis);
        self
    }

    /// Set the network identifier.
    pub fn with_network_id(mut self, network_id: u64) -> Self {
        self.network_id = network_id;
        self
    }

    /// Set the sync mode.
    pub fn with_sync_mode(mut self, sync_mode: SyncMode) -> Self {
        self.sync_mode = sync_mode;
        self
    }

    /// Set the sync mode by name (`full`, `fast` or `light`).
    pub fn with_sync_mode_name(self, name: &str) -> Result<Self, NodeError> {
        Ok(self.with_sync_mode(name.parse()?))
    }

    /// Enable light serving with `percent` of the peer slots and at most
    /// `peers` light peers.
    pub fn with_light_serving(mut self, percent: u32, peers: usize) -> Self {
        self.light_serv = percent;
        self.light_peers = peers;
        self
    }

    /// Skip the database version check.
    pub fn with_skip_bc_version_check(mut self, skip: bool) -> Self {
        self.skip_bc_version_check = skip;
        self
    }

    /// Set the beneficiary.
    pub fn with_etherbase(mut self, etherbase: Address) -> Self {
        self.etherbase = etherbase;
        self
    }

    /// Set the minimum gas price.
    pub fn with_gas_price(mut self, gas_price: u128) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Set the miner extra-data.
    pub fn with_extra_data(mut self, extra_data: Bytes) -> Self {
        self.extra_data = extra_data;
        self
    }

    /// Set the proof-of-work settings.
    pub fn with_ethash(mut self, ethash: EthashConfig) -> Self {
        self.ethash = ethash;
        self
    }

    /// Set the transaction pool journal path.
    pub fn with_tx_pool_journal(mut self, journal: impl Into<PathBuf>) -> Self {
        self.tx_pool_journal = journal.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{consensus::ethash::PowMode, network::InvalidSyncMode};

    #[test]
    fn test_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.network_id, 1);
        assert_eq!(config.sync_mode, SyncMode::Fast);
        assert_eq!(config.light_peers, 100);
        assert_eq!(config.database_cache, 768);
        assert_eq!(config.database_handles, 256);
        assert_eq!(config.gas_price, 18_000_000_000);
        assert_eq!(config.tx_pool_journal, PathBuf::from("transactions.rlp"));
    }

    #[test]
    fn test_parse_partial_json() {
        let config: NodeConfig = serde_json::from_str(
            r#"{
                "networkId": 1337,
                "syncMode": "full",
                "lightServ": 25,
                "skipBcVersionCheck": true,
                "etherbase": "0x00000000000000000000000000000000000000aa",
                "ethash": { "powMode": "fake" }
            }"#,
        )
        .unwrap();

        assert_eq!(config.network_id, 1337);
        assert_eq!(config.sync_mode, SyncMode::Full);
        assert_eq!(config.light_serv, 25);
        assert!(config.skip_bc_version_check);
        assert_eq!(config.etherbase, Address::with_last_byte(0xaa));
        assert_eq!(config.ethash.pow_mode, PowMode::Fake);
        assert_eq!(config.light_peers, DEFAULT_LIGHT_PEERS);
    }

    #[test]
    fn test_unknown_sync_mode_rejected() {
        let err = serde_json::from_str::<NodeConfig>(r#"{"syncMode":"warp"}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_sync_mode_by_name() {
        let config = NodeConfig::default().with_sync_mode_name("full").unwrap();
        assert_eq!(config.sync_mode, SyncMode::Full);

        let err = NodeConfig::default().with_sync_mode_name("warp").unwrap_err();
        assert!(matches!(&err, NodeError::SyncMode(InvalidSyncMode(name)) if name == "warp"));
        assert_eq!(err.to_string(), "invalid sync mode \"warp\"");
    }

    #[test]
    fn test_builders() {
        let config = NodeConfig::default()
            .with_network_id(5)
            .with_light_serving(50, 10)
            .with_gas_price(1)
            .with_tx_pool_journal("");

        assert_eq!(config.network_id, 5);
        assert_eq!((config.light_serv, config.light_peers), (50, 10));
        assert_eq!(config.gas_price, 1);
        assert!(config.tx_pool_journal.as_os_str().is_empty());
    }
}
