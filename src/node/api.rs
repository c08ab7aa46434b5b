//! RPC service descriptors.
//!
//! The node does not serve RPC itself. It hands the RPC server a list of
//! [`RpcApi`] descriptors; the server registers each service under its
//! namespace and exposes public ones on every transport.

use super::{FullNode, NodeError};
use crate::{
    chain::ChainHead,
    chainspec::{ForkSchedule, Rules},
    storage::schema,
};
use alloy_primitives::{Address, Bytes, B256, U256};
use serde::Serialize;
use std::{any::Any, fmt, path::Path, sync::Arc};
use tracing::info;

/// An RPC service offered under a namespace.
#[derive(Clone)]
pub struct RpcApi {
    /// Namespace, e.g. `eth`.
    pub namespace: &'static str,
    /// Service version.
    pub version: &'static str,
    /// The service object.
    pub service: Arc<dyn Any + Send + Sync>,
    /// Whether the service is exposed on public transports.
    pub public: bool,
}

impl fmt::Debug for RpcApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcApi")
            .field("namespace", &self.namespace)
            .field("version", &self.version)
            .field("public", &self.public)
            .finish_non_exhaustive()
    }
}

impl RpcApi {
    /// Describe `service` under `namespace`.
    pub fn new(
        namespace: &'static str,
        version: &'static str,
        service: impl Any + Send + Sync,
        public: bool,
    ) -> Self {
        Self { namespace, version, service: Arc::new(service), public }
    }

    /// The service as a concrete type.
    pub fn service<T: Any>(&self) -> Option<&T> {
        self.service.downcast_ref()
    }
}

/// `eth` namespace: node-level information.
#[derive(Debug, Clone)]
pub struct EthApi {
    node: Arc<FullNode>,
}

impl EthApi {
    pub(crate) fn new(node: Arc<FullNode>) -> Self {
        Self { node }
    }

    /// `eth_etherbase`.
    pub fn etherbase(&self) -> Result<Address, NodeError> {
        self.node.etherbase()
    }

    /// `eth_coinbase`, an alias of [`Self::etherbase`].
    pub fn coinbase(&self) -> Result<Address, NodeError> {
        self.etherbase()
    }

    /// `eth_protocolVersion`.
    pub fn protocol_version(&self) -> u32 {
        self.node.protocol_version()
    }

    /// `eth_chainId`.
    pub fn chain_id(&self) -> Option<U256> {
        self.node.chain_config().chain_id
    }
}

/// `eth` namespace: mining status.
#[derive(Debug, Clone)]
pub struct PublicMinerApi {
    node: Arc<FullNode>,
}

impl PublicMinerApi {
    pub(crate) fn new(node: Arc<FullNode>) -> Self {
        Self { node }
    }

    /// `eth_mining`.
    pub fn mining(&self) -> bool {
        self.node.is_mining()
    }
}

/// `miner` namespace: mining control.
#[derive(Debug, Clone)]
pub struct MinerApi {
    node: Arc<FullNode>,
}

impl MinerApi {
    pub(crate) fn new(node: Arc<FullNode>) -> Self {
        Self { node }
    }

    /// `miner_start`.
    ///
    /// `threads` applies to ethash only. `None` lets the engine pick, `0`
    /// disables local sealing.
    pub fn start(&self, threads: Option<i32>) -> Result<(), NodeError> {
        let threads = match threads {
            None => 0,
            Some(0) => -1,
            Some(n) => n,
        };
        if let Some(ethash) = self.node.engine().as_ethash() {
            info!(target: "node", threads, "Updated mining threads");
            ethash.set_threads(threads);
        }
        if self.node.is_mining() {
            return Ok(());
        }
        // Propagate the initial price point to the transaction pool.
        self.node.tx_pool().set_gas_price(self.node.gas_price());
        self.node.start_mining(true)
    }

    /// `miner_stop`.
    pub fn stop(&self) -> bool {
        if let Some(ethash) = self.node.engine().as_ethash() {
            ethash.set_threads(-1);
        }
        self.node.stop_mining();
        true
    }

    /// `miner_setExtra`.
    pub fn set_extra(&self, extra: &str) -> Result<bool, NodeError> {
        self.node.set_miner_extra(Bytes::copy_from_slice(extra.as_bytes()))?;
        Ok(true)
    }

    /// `miner_setGasPrice`.
    pub fn set_gas_price(&self, price: u128) -> bool {
        self.node.set_gas_price(price);
        true
    }

    /// `miner_setEtherbase`.
    pub fn set_etherbase(&self, etherbase: Address) -> bool {
        self.node.set_etherbase(etherbase);
        true
    }

    /// `miner_getHashrate`. Zero for engines without a hashrate.
    pub fn get_hashrate(&self) -> f64 {
        self.node.engine().as_ethash().map_or(0.0, |ethash| ethash.hashrate())
    }
}

#[derive(Serialize)]
struct CanonicalEntry {
    number: u64,
    hash: B256,
}

/// `admin` namespace.
#[derive(Debug, Clone)]
pub struct AdminApi {
    node: Arc<FullNode>,
}

impl AdminApi {
    pub(crate) fn new(node: Arc<FullNode>) -> Self {
        Self { node }
    }

    /// `admin_exportChain`: writes the canonical `(number, hash)` pairs up to
    /// the head as a JSON array.
    pub fn export_chain(&self, path: impl AsRef<Path>) -> Result<bool, NodeError> {
        let head = self.node.blockchain().head().number;
        let db = self.node.chain_db();
        let mut entries = Vec::with_capacity(head as usize + 1);
        for number in 0..=head {
            if let Some(hash) = schema::read_canonical_hash(db.as_ref(), number)? {
                entries.push(CanonicalEntry { number, hash });
            }
        }
        std::fs::write(path.as_ref(), serde_json::to_vec(&entries)?)?;
        info!(target: "node", path = %path.as_ref().display(), blocks = entries.len(), "Exported chain");
        Ok(true)
    }
}

/// `debug` namespace, public part.
#[derive(Debug, Clone)]
pub struct DebugApi {
    node: Arc<FullNode>,
}

impl DebugApi {
    pub(crate) fn new(node: Arc<FullNode>) -> Self {
        Self { node }
    }

    /// Current chain head.
    pub fn head(&self) -> ChainHead {
        self.node.blockchain().head()
    }
}

/// `debug` namespace, private part.
#[derive(Debug, Clone)]
pub struct PrivateDebugApi {
    config: ForkSchedule,
    node: Arc<FullNode>,
}

impl PrivateDebugApi {
    pub(crate) fn new(config: ForkSchedule, node: Arc<FullNode>) -> Self {
        Self { config, node }
    }

    /// Schedule the node runs with.
    pub fn chain_config(&self) -> &ForkSchedule {
        &self.config
    }

    /// Fork rules at `height`.
    pub fn rules_at(&self, height: u64) -> Rules {
        self.config.rules_at(height)
    }

    /// `debug_setHead`: rewinds the canonical chain.
    pub fn set_head(&self, number: u64) -> Result<(), NodeError> {
        Ok(self.node.blockchain().set_head(number)?)
    }
}

/// `net` namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetApi {
    network_id: u64,
    max_peers: usize,
}

impl NetApi {
    pub(crate) fn new(network_id: u64, max_peers: usize) -> Self {
        Self { network_id, max_peers }
    }

    /// `net_listening`. The node always listens.
    pub fn listening(&self) -> bool {
        true
    }

    /// `net_version`.
    pub fn version(&self) -> String {
        self.network_id.to_string()
    }

    /// Peer budget of the server.
    pub fn max_peers(&self) -> usize {
        self.max_peers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Echo(u8);

    #[test]
    fn test_service_downcast() {
        let api = RpcApi::new("echo", "1.0", Echo(4), true);
        assert_eq!(api.service::<Echo>(), Some(&Echo(4)));
        assert!(api.service::<NetApi>().is_none());
        assert!(format!("{api:?}").contains("echo"));
    }

    #[test]
    fn test_net_api() {
        let api = NetApi::new(1337, 25);
        assert!(api.listening());
        assert_eq!(api.version(), "1337");
        assert_eq!(api.max_peers(), 25);
    }
}
