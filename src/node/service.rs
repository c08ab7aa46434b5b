//! Full node service.

use super::{
    api::{AdminApi, DebugApi, EthApi, MinerApi, NetApi, PrivateDebugApi, PublicMinerApi},
    bloom::{start_bloom_handlers, BloomRetrieval, BLOOM_RETRIEVAL_QUEUE},
    extra::make_extra_data,
    NodeComponents, NodeConfig, NodeError, RpcApi, ServiceContext, Shutdown, ShutdownSignal,
};
use crate::{
    accounts::{sign_fn, AccountManager},
    chain::{BlockChain, BloomIndexer, EventMux, TxPool},
    chainspec::{setup_genesis, ForkSchedule, Genesis, GenesisSetup},
    consensus::{create_consensus_engine, Engine},
    miner::{Miner, MinerConfig},
    network::{
        full_sync_peers, LightServer, NetworkServer, Protocol, ProtocolManager, SyncMode,
        ETH_VERSIONS,
    },
    storage::{schema, ChainDatabase, UpgradeHandle, BLOCKCHAIN_VERSION},
};
use alloy_primitives::{Address, Bytes};
use parking_lot::{Mutex, RwLock};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tracing::{debug, error, info, warn};

/// A long-running service plugged into the p2p host.
pub trait Service: Send + Sync {
    /// Sub-protocols the host should offer to peers.
    fn protocols(&self) -> Vec<Protocol>;

    /// Starts the service once the p2p server is up.
    fn start(&self, server: &NetworkServer) -> Result<(), NodeError>;

    /// Stops the service and releases its resources.
    fn stop(&self) -> Result<(), NodeError>;

    /// RPC services to register.
    fn apis(self: Arc<Self>) -> Vec<RpcApi>;
}

/// Lifecycle of a [`FullNode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    /// Built, not started.
    Constructed,
    /// Serving peers.
    Running,
    /// Stopped. The node cannot be restarted.
    Stopped,
}

/// Fields changed at runtime by API handlers and the mining driver.
#[derive(Debug, Clone, Copy)]
struct MutableConfig {
    etherbase: Address,
    gas_price: u128,
}

/// A full node: chain, pool, protocol handler and miner under one lifecycle.
pub struct FullNode {
    config: NodeConfig,
    chain_config: ForkSchedule,

    chain_db: Arc<dyn ChainDatabase>,
    upgrade: Option<UpgradeHandle>,
    event_mux: Arc<EventMux>,
    account_manager: Arc<dyn AccountManager>,
    engine: Engine,

    blockchain: Arc<dyn BlockChain>,
    bloom_indexer: Arc<dyn BloomIndexer>,
    bloom_requests: mpsc::Sender<BloomRetrieval>,
    bloom_queue: Arc<AsyncMutex<mpsc::Receiver<BloomRetrieval>>>,
    tx_pool: Arc<dyn TxPool>,
    protocol_manager: Arc<dyn ProtocolManager>,
    light_server: RwLock<Option<Arc<dyn LightServer>>>,
    miner: Arc<dyn Miner>,

    accept_txs: Arc<AtomicBool>,
    mutable: RwLock<MutableConfig>,
    net_api: RwLock<Option<NetApi>>,
    state: Mutex<NodeState>,
    shutdown: ShutdownSignal,
}

impl std::fmt::Debug for FullNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FullNode")
            .field("network_id", &self.config.network_id)
            .field("engine", &self.engine.name())
            .field("state", &self.state())
            .field("mutable", &*self.mutable.read())
            .finish_non_exhaustive()
    }
}

impl FullNode {
    /// Bootstraps the node.
    ///
    /// Opens `chaindata`, reconciles the genesis and schedule, selects the
    /// engine and builds every collaborator through `components`. A schedule
    /// change that conflicts with imported blocks rewinds the chain before
    /// the new schedule is persisted.
    pub fn new(
        ctx: &ServiceContext,
        config: NodeConfig,
        components: &dyn NodeComponents,
    ) -> Result<Self, NodeError> {
        if config.sync_mode == SyncMode::Light {
            return Err(NodeError::LightSync);
        }

        let chain_db =
            ctx.open_database("chaindata", config.database_cache, config.database_handles)?;
        let upgrade = chain_db.start_upgrade();

        let GenesisSetup { config: chain_config, hash: genesis_hash, compat } =
            setup_genesis(chain_db.as_ref(), config.genesis.as_ref())?;
        info!(target: "node", config = %chain_config, "Initialised chain configuration");

        let engine = create_consensus_engine(
            &chain_config,
            &config.ethash,
            ctx.shared_ethash(),
            |path| ctx.resolve_path(path),
            chain_db.clone(),
        );

        let versions: Vec<u32> = ETH_VERSIONS.iter().map(|(version, _)| *version).collect();
        info!(target: "node", ?versions, network = config.network_id, "Initialising protocol");

        if !config.skip_bc_version_check {
            let have = schema::read_blockchain_version(chain_db.as_ref())?;
            if have != BLOCKCHAIN_VERSION && have != 0 {
                return Err(NodeError::VersionMismatch { have, want: BLOCKCHAIN_VERSION });
            }
            schema::write_blockchain_version(chain_db.as_ref(), BLOCKCHAIN_VERSION)?;
        }

        let event_mux = Arc::new(EventMux::new());
        let blockchain = components.create_blockchain(
            chain_db.clone(),
            &chain_config,
            &engine,
            event_mux.clone(),
        )?;

        if let Some(compat) = compat {
            warn!(target: "node", err = %compat, "Rewinding chain to upgrade configuration");
            blockchain.set_head(compat.rewind_to)?;
            schema::write_chain_config(chain_db.as_ref(), genesis_hash, &chain_config)?;
        }

        let bloom_indexer = components.create_bloom_indexer(chain_db.clone());
        bloom_indexer.start(blockchain.clone());
        let (bloom_requests, bloom_queue) = mpsc::channel(BLOOM_RETRIEVAL_QUEUE);

        let journal = (!config.tx_pool_journal.as_os_str().is_empty())
            .then(|| ctx.resolve_path(&config.tx_pool_journal));
        let tx_pool = components.create_tx_pool(config.gas_price, journal, blockchain.clone());

        let accept_txs = Arc::new(AtomicBool::new(false));
        let protocol_manager = components.create_protocol_manager(
            &chain_config,
            config.sync_mode,
            config.network_id,
            &engine,
            blockchain.clone(),
            tx_pool.clone(),
            accept_txs.clone(),
        )?;

        let miner = components.create_miner(
            MinerConfig::new(config.etherbase).with_gas_price(config.gas_price),
            engine.clone(),
            blockchain.clone(),
            event_mux.clone(),
        );
        miner.set_extra(make_extra_data(&config.extra_data))?;

        let mutable =
            RwLock::new(MutableConfig { etherbase: config.etherbase, gas_price: config.gas_price });

        Ok(Self {
            config,
            chain_config,
            chain_db,
            upgrade,
            event_mux,
            account_manager: ctx.account_manager().clone(),
            engine,
            blockchain,
            bloom_indexer,
            bloom_requests,
            bloom_queue: Arc::new(AsyncMutex::new(bloom_queue)),
            tx_pool,
            protocol_manager,
            light_server: RwLock::new(None),
            miner,
            accept_txs,
            mutable,
            net_api: RwLock::new(None),
            state: Mutex::new(NodeState::Constructed),
            shutdown: ShutdownSignal::new(),
        })
    }

    /// Attaches a light server and hands it the bloom indexer.
    pub fn add_light_server(&self, server: Arc<dyn LightServer>) {
        server.set_bloom_indexer(self.bloom_indexer.clone());
        *self.light_server.write() = Some(server);
    }

    /// Current lifecycle state.
    pub fn state(&self) -> NodeState {
        *self.state.lock()
    }

    /// Beneficiary of mined blocks.
    ///
    /// Falls back to the first account of the first wallet and remembers it.
    pub fn etherbase(&self) -> Result<Address, NodeError> {
        let etherbase = self.mutable.read().etherbase;
        if etherbase != Address::ZERO {
            return Ok(etherbase);
        }

        let first = self
            .account_manager
            .wallets()
            .first()
            .and_then(|wallet| wallet.accounts().first().copied());
        let Some(account) = first else {
            return Err(NodeError::NoEtherbase);
        };

        let mut mutable = self.mutable.write();
        // A concurrent `set_etherbase` wins.
        if mutable.etherbase == Address::ZERO {
            mutable.etherbase = account;
            info!(target: "node", address = %account, "Etherbase automatically configured");
        }
        Ok(mutable.etherbase)
    }

    /// Sets the beneficiary and forwards it to the miner.
    pub fn set_etherbase(&self, etherbase: Address) {
        self.mutable.write().etherbase = etherbase;
        self.miner.set_etherbase(etherbase);
    }

    /// Minimum gas price of pooled transactions.
    pub fn gas_price(&self) -> u128 {
        self.mutable.read().gas_price
    }

    /// Updates the minimum gas price and applies it to the pool.
    pub fn set_gas_price(&self, price: u128) {
        self.mutable.write().gas_price = price;
        self.tx_pool.set_gas_price(price);
    }

    /// Starts mining.
    ///
    /// On clique chains the beneficiary's wallet is authorized as the block
    /// signer. `local` mining also opens the pool to peer transactions, so a
    /// single-miner private network works without a sync peer.
    pub fn start_mining(&self, local: bool) -> Result<(), NodeError> {
        let etherbase = self.etherbase().map_err(|err| {
            error!(target: "node", %err, "Cannot start mining without etherbase");
            NodeError::EtherbaseMissing(Box::new(err))
        })?;

        if let Some(clique) = self.engine.as_clique() {
            let wallet = self.account_manager.find(&etherbase).map_err(|err| {
                error!(target: "node", %err, "Etherbase account unavailable locally");
                NodeError::SignerMissing(err)
            })?;
            clique.authorize(etherbase, sign_fn(wallet));
        }

        if local {
            self.accept_txs.store(true, Ordering::Release);
        }
        // The worker picks the command up on its own task.
        self.miner.start(etherbase);
        Ok(())
    }

    /// Stops mining.
    pub fn stop_mining(&self) {
        self.miner.stop();
    }

    /// Whether the miner is producing blocks.
    pub fn is_mining(&self) -> bool {
        self.miner.mining()
    }

    /// Changes the header extra-data of mined blocks.
    pub fn set_miner_extra(&self, extra: Bytes) -> Result<(), NodeError> {
        Ok(self.miner.set_extra(extra)?)
    }

    /// Wipes the chain and re-initialises it from `genesis`.
    pub fn reset_with_genesis_block(&self, genesis: &Genesis) -> Result<(), NodeError> {
        Ok(self.blockchain.reset_with_genesis_block(genesis)?)
    }

    /// Account manager of the host.
    pub fn account_manager(&self) -> &Arc<dyn AccountManager> {
        &self.account_manager
    }

    /// Canonical chain.
    pub fn blockchain(&self) -> &Arc<dyn BlockChain> {
        &self.blockchain
    }

    /// Transaction pool.
    pub fn tx_pool(&self) -> &Arc<dyn TxPool> {
        &self.tx_pool
    }

    /// Consensus engine.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// Chain database.
    pub fn chain_db(&self) -> &Arc<dyn ChainDatabase> {
        &self.chain_db
    }

    /// Event multiplexer.
    pub fn event_mux(&self) -> &Arc<EventMux> {
        &self.event_mux
    }

    /// `eth` protocol manager.
    pub fn protocol_manager(&self) -> &Arc<dyn ProtocolManager> {
        &self.protocol_manager
    }

    /// Schedule the node runs with.
    pub fn chain_config(&self) -> &ForkSchedule {
        &self.chain_config
    }

    /// The node always listens.
    pub fn is_listening(&self) -> bool {
        true
    }

    /// Version of the newest `eth` sub-protocol offered.
    pub fn protocol_version(&self) -> u32 {
        self.protocol_manager.protocols().first().map_or(0, |protocol| protocol.version)
    }

    /// Network identifier.
    pub fn net_version(&self) -> u64 {
        self.config.network_id
    }

    /// Queue for bloom bit retrievals.
    pub fn bloom_requests(&self) -> mpsc::Sender<BloomRetrieval> {
        self.bloom_requests.clone()
    }

    /// Resolves once the node has stopped.
    pub fn shutdown(&self) -> Shutdown {
        self.shutdown.subscribe()
    }
}

impl Service for FullNode {
    fn protocols(&self) -> Vec<Protocol> {
        let mut protocols = self.protocol_manager.protocols();
        if let Some(light) = self.light_server.read().as_ref() {
            protocols.extend(light.protocols());
        }
        protocols
    }

    fn start(&self, server: &NetworkServer) -> Result<(), NodeError> {
        {
            let mut state = self.state.lock();
            if *state != NodeState::Constructed {
                return Err(NodeError::InvalidLifecycle { op: "start", state: *state });
            }
            *state = NodeState::Running;
        }

        start_bloom_handlers(
            self.bloom_indexer.clone(),
            self.bloom_queue.clone(),
            self.shutdown.subscribe(),
        );
        *self.net_api.write() = Some(NetApi::new(self.config.network_id, server.max_peers));

        let max_peers = full_sync_peers(
            server.max_peers,
            self.config.light_serv > 0,
            self.config.light_peers,
        );
        self.protocol_manager.start(max_peers);
        if let Some(light) = self.light_server.read().as_ref() {
            light.start(server);
        }
        info!(target: "node", max_peers, network = self.config.network_id, "Full node started");
        Ok(())
    }

    fn stop(&self) -> Result<(), NodeError> {
        *self.state.lock() = NodeState::Stopped;

        if let Some(upgrade) = &self.upgrade {
            if let Err(err) = upgrade.stop() {
                warn!(target: "node", %err, "Database upgrade failed");
            }
        }
        if let Err(err) = self.bloom_indexer.close() {
            warn!(target: "node", %err, "Failed to close bloom indexer");
        }
        self.blockchain.stop();
        self.protocol_manager.stop();
        if let Some(light) = self.light_server.read().as_ref() {
            light.stop();
        }
        self.tx_pool.stop();
        self.miner.stop();
        self.event_mux.stop();

        self.chain_db.close();
        self.shutdown.fire();
        debug!(target: "node", "Full node stopped");
        Ok(())
    }

    fn apis(self: Arc<Self>) -> Vec<RpcApi> {
        let mut apis = self.engine.apis();
        apis.extend([
            RpcApi::new("eth", "1.0", EthApi::new(self.clone()), true),
            RpcApi::new("eth", "1.0", PublicMinerApi::new(self.clone()), true),
            RpcApi::new("miner", "1.0", MinerApi::new(self.clone()), false),
            RpcApi::new("admin", "1.0", AdminApi::new(self.clone()), false),
            RpcApi::new("debug", "1.0", DebugApi::new(self.clone()), true),
            RpcApi::new(
                "debug",
                "1.0",
                PrivateDebugApi::new(self.chain_config.clone(), self.clone()),
                false,
            ),
        ]);
        if let Some(net) = self.net_api.read().clone() {
            apis.push(RpcApi::new("net", "1.0", net, true));
        }
        apis
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        accounts::{KeyStore, Wallet, WalletManager},
        chain::ChainHead,
        chainspec::{CliqueConfig, EngineSchedule, Hardfork, ALL_CLIQUE_PROTOCOL_CHANGES},
        consensus::{clique::CliqueApi, PowMode},
        miner::MinerResult,
        network::LesServer,
        node::MemoryComponents,
        storage::{MemoryDatabase, MemoryDatabaseOpener, StorageError},
    };
    use alloy_primitives::{B256, U256};
    use std::{path::PathBuf, sync::atomic::AtomicUsize, time::Duration};

    type Log = Arc<Mutex<Vec<&'static str>>>;

    fn fake_pow() -> crate::consensus::EthashConfig {
        crate::consensus::EthashConfig { pow_mode: PowMode::Fake, ..Default::default() }
    }

    fn test_genesis(config: ForkSchedule) -> Genesis {
        Genesis {
            config,
            nonce: 0,
            timestamp: 1_700_000_000,
            extra_data: Bytes::new(),
            gas_limit: 8_000_000,
            difficulty: U256::from(131_072),
            mix_hash: B256::ZERO,
            coinbase: Address::ZERO,
        }
    }

    fn dev_config() -> NodeConfig {
        NodeConfig::default()
            .with_network_id(1337)
            .with_ethash(fake_pow())
            .with_tx_pool_journal("")
    }

    fn context(accounts: Arc<dyn AccountManager>) -> (Arc<MemoryDatabaseOpener>, ServiceContext) {
        let opener = Arc::new(MemoryDatabaseOpener::new());
        (opener.clone(), ServiceContext::new(opener, accounts))
    }

    fn wallet_with(seed: &str) -> (Arc<WalletManager>, Address) {
        let store = KeyStore::new("keystore://test");
        let address = store.import_insecure_seed(seed).unwrap();
        let manager = WalletManager::new();
        manager.add_wallet(Arc::new(store));
        (Arc::new(manager), address)
    }

    /// Counts wallet enumerations.
    #[derive(Debug, Default)]
    struct CountingAccounts {
        inner: WalletManager,
        calls: AtomicUsize,
    }

    impl AccountManager for CountingAccounts {
        fn wallets(&self) -> Vec<Arc<dyn Wallet>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.wallets()
        }
    }

    // Recording fixtures for the stop order.

    struct Recorded<T: ?Sized> {
        inner: Arc<T>,
        log: Log,
    }

    impl BlockChain for Recorded<dyn BlockChain> {
        fn head(&self) -> ChainHead {
            self.inner.head()
        }
        fn set_head(&self, number: u64) -> Result<(), crate::chain::ChainError> {
            self.inner.set_head(number)
        }
        fn reset_with_genesis_block(
            &self,
            genesis: &Genesis,
        ) -> Result<(), crate::chain::ChainError> {
            self.inner.reset_with_genesis_block(genesis)
        }
        fn stop(&self) {
            self.log.lock().push("chain");
            self.inner.stop();
        }
    }

    impl BloomIndexer for Recorded<dyn BloomIndexer> {
        fn start(&self, chain: Arc<dyn BlockChain>) {
            self.inner.start(chain)
        }
        fn sections(&self) -> u64 {
            self.inner.sections()
        }
        fn bloom_bits(&self, bit: u32, section: u64) -> Option<Bytes> {
            self.inner.bloom_bits(bit, section)
        }
        fn close(&self) -> Result<(), StorageError> {
            self.log.lock().push("bloom");
            self.inner.close()
        }
    }

    impl TxPool for Recorded<dyn TxPool> {
        fn add_remotes(&self, hashes: &[B256]) -> usize {
            self.inner.add_remotes(hashes)
        }
        fn pending(&self) -> usize {
            self.inner.pending()
        }
        fn gas_price(&self) -> u128 {
            self.inner.gas_price()
        }
        fn set_gas_price(&self, price: u128) {
            self.inner.set_gas_price(price)
        }
        fn stop(&self) {
            self.log.lock().push("txpool");
            self.inner.stop();
        }
    }

    impl ProtocolManager for Recorded<dyn ProtocolManager> {
        fn protocols(&self) -> Vec<Protocol> {
            self.inner.protocols()
        }
        fn start(&self, max_peers: usize) {
            self.inner.start(max_peers)
        }
        fn stop(&self) {
            self.log.lock().push("protocols");
            self.inner.stop();
        }
        fn handle_transactions(&self, hashes: &[B256]) -> usize {
            self.inner.handle_transactions(hashes)
        }
    }

    impl Miner for Recorded<dyn Miner> {
        fn start(&self, etherbase: Address) {
            self.inner.start(etherbase)
        }
        fn stop(&self) {
            self.log.lock().push("miner");
            self.inner.stop();
        }
        fn mining(&self) -> bool {
            self.inner.mining()
        }
        fn set_etherbase(&self, etherbase: Address) {
            self.inner.set_etherbase(etherbase)
        }
        fn set_extra(&self, extra: Bytes) -> MinerResult<()> {
            self.inner.set_extra(extra)
        }
    }

    impl LightServer for Recorded<dyn LightServer> {
        fn protocols(&self) -> Vec<Protocol> {
            self.inner.protocols()
        }
        fn start(&self, server: &NetworkServer) {
            self.inner.start(server)
        }
        fn stop(&self) {
            self.log.lock().push("light");
            self.inner.stop();
        }
        fn set_bloom_indexer(&self, indexer: Arc<dyn BloomIndexer>) {
            self.inner.set_bloom_indexer(indexer)
        }
    }

    impl ChainDatabase for Recorded<MemoryDatabase> {
        fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, StorageError> {
            self.inner.get(key)
        }
        fn put(&self, key: &[u8], value: &[u8]) -> Result<(), StorageError> {
            self.inner.put(key, value)
        }
        fn delete(&self, key: &[u8]) -> Result<(), StorageError> {
            self.inner.delete(key)
        }
        fn start_upgrade(&self) -> Option<UpgradeHandle> {
            struct OnExit(Log);
            impl Drop for OnExit {
                fn drop(&mut self) {
                    self.0.lock().push("upgrade");
                }
            }
            let guard = OnExit(self.log.clone());
            UpgradeHandle::spawn("upgrade", move || {
                let _guard = &guard;
                std::thread::sleep(Duration::from_millis(1));
                Ok(false)
            })
            .ok()
        }
        fn close(&self) {
            self.log.lock().push("db");
            self.inner.close();
        }
    }

    struct RecordingOpener {
        db: Arc<MemoryDatabase>,
        log: Log,
    }

    impl crate::storage::DatabaseOpener for RecordingOpener {
        fn open_database(
            &self,
            _name: &str,
            _cache_mb: usize,
            _handles: usize,
        ) -> Result<Arc<dyn ChainDatabase>, StorageError> {
            Ok(Arc::new(Recorded { inner: self.db.clone(), log: self.log.clone() }))
        }
    }

    struct RecordingComponents {
        log: Log,
    }

    impl NodeComponents for RecordingComponents {
        fn create_blockchain(
            &self,
            db: Arc<dyn ChainDatabase>,
            config: &ForkSchedule,
            engine: &Engine,
            events: Arc<EventMux>,
        ) -> Result<Arc<dyn BlockChain>, NodeError> {
            let inner = MemoryComponents.create_blockchain(db, config, engine, events)?;
            Ok(Arc::new(Recorded { inner, log: self.log.clone() }))
        }
        fn create_bloom_indexer(&self, db: Arc<dyn ChainDatabase>) -> Arc<dyn BloomIndexer> {
            let inner = MemoryComponents.create_bloom_indexer(db);
            Arc::new(Recorded { inner, log: self.log.clone() })
        }
        fn create_tx_pool(
            &self,
            gas_price: u128,
            journal: Option<PathBuf>,
            chain: Arc<dyn BlockChain>,
        ) -> Arc<dyn TxPool> {
            let inner = MemoryComponents.create_tx_pool(gas_price, journal, chain);
            Arc::new(Recorded { inner, log: self.log.clone() })
        }
        fn create_protocol_manager(
            &self,
            config: &ForkSchedule,
            mode: SyncMode,
            network_id: u64,
            engine: &Engine,
            chain: Arc<dyn BlockChain>,
            tx_pool: Arc<dyn TxPool>,
            accept_txs: Arc<AtomicBool>,
        ) -> Result<Arc<dyn ProtocolManager>, NodeError> {
            let inner = MemoryComponents.create_protocol_manager(
                config, mode, network_id, engine, chain, tx_pool, accept_txs,
            )?;
            Ok(Arc::new(Recorded { inner, log: self.log.clone() }))
        }
        fn create_miner(
            &self,
            config: MinerConfig,
            engine: Engine,
            chain: Arc<dyn BlockChain>,
            events: Arc<EventMux>,
        ) -> Arc<dyn Miner> {
            let inner = MemoryComponents.create_miner(config, engine, chain, events);
            Arc::new(Recorded { inner, log: self.log.clone() })
        }
    }

    #[tokio::test]
    async fn test_stop_order() {
        let log: Log = Arc::default();
        let db = MemoryDatabase::new_arc();
        let opener = Arc::new(RecordingOpener { db: db.clone(), log: log.clone() });
        let ctx = ServiceContext::new(opener, Arc::new(WalletManager::new()));

        let node =
            FullNode::new(&ctx, dev_config(), &RecordingComponents { log: log.clone() }).unwrap();
        let light: Arc<dyn LightServer> = Arc::new(LesServer::new());
        node.add_light_server(Arc::new(Recorded { inner: light, log: log.clone() }));

        let mut shutdown = node.shutdown();
        node.start(&NetworkServer::new(50)).unwrap();
        node.stop().unwrap();

        assert_eq!(
            *log.lock(),
            vec!["upgrade", "bloom", "chain", "protocols", "light", "txpool", "miner", "db"]
        );
        assert!(node.event_mux().is_stopped());
        assert!(db.is_closed());
        tokio::time::timeout(Duration::from_secs(1), shutdown.wait()).await.unwrap();
        assert_eq!(node.state(), NodeState::Stopped);
    }

    #[tokio::test]
    #[should_panic(expected = "shutdown signal fired twice")]
    async fn test_double_stop_panics() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let node = FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap();
        node.stop().unwrap();
        let _ = node.stop();
    }

    #[tokio::test]
    async fn test_lifecycle() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let node = FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap();
        assert_eq!(node.state(), NodeState::Constructed);

        node.start(&NetworkServer::new(25)).unwrap();
        assert_eq!(node.state(), NodeState::Running);
        assert!(matches!(
            node.start(&NetworkServer::new(25)),
            Err(NodeError::InvalidLifecycle { op: "start", state: NodeState::Running })
        ));

        node.stop().unwrap();
        assert!(matches!(
            node.start(&NetworkServer::new(25)),
            Err(NodeError::InvalidLifecycle { state: NodeState::Stopped, .. })
        ));
    }

    #[tokio::test]
    async fn test_light_sync_rejected() {
        let (opener, ctx) = context(Arc::new(WalletManager::new()));
        let config = dev_config().with_sync_mode(SyncMode::Light);
        assert!(matches!(
            FullNode::new(&ctx, config, &MemoryComponents),
            Err(NodeError::LightSync)
        ));
        // Nothing was opened.
        assert!(opener.database("chaindata").is_none());
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let db = ctx.open_database("chaindata", 0, 0).unwrap();
        schema::write_blockchain_version(db.as_ref(), 2).unwrap();

        let err = FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap_err();
        assert!(matches!(err, NodeError::VersionMismatch { have: 2, want: BLOCKCHAIN_VERSION }));

        let node =
            FullNode::new(&ctx, dev_config().with_skip_bc_version_check(true), &MemoryComponents)
                .unwrap();
        // Skipping leaves the stored version alone.
        assert_eq!(schema::read_blockchain_version(node.chain_db().as_ref()).unwrap(), 2);
    }

    #[tokio::test]
    async fn test_version_written_on_fresh_database() {
        let (opener, ctx) = context(Arc::new(WalletManager::new()));
        FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap();
        let db = opener.database("chaindata").unwrap();
        assert_eq!(schema::read_blockchain_version(db.as_ref()).unwrap(), BLOCKCHAIN_VERSION);
    }

    #[tokio::test]
    async fn test_compat_rewind_on_restart() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let old = test_genesis(ForkSchedule::new(U256::from(1337)).with_fork(Hardfork::Homestead, 100));
        let node = FullNode::new(&ctx, dev_config().with_genesis(old.clone()), &MemoryComponents)
            .unwrap();
        let genesis_hash = node.blockchain().head().hash;
        node.stop().unwrap();

        // Pretend 150 blocks were imported.
        let db = ctx.open_database("chaindata", 0, 0).unwrap();
        for number in 1..=150u64 {
            schema::write_canonical_hash(db.as_ref(), number, B256::with_last_byte(number as u8))
                .unwrap();
        }
        schema::write_head_block(db.as_ref(), 150, B256::with_last_byte(150)).unwrap();

        let new = Genesis {
            config: ForkSchedule::new(U256::from(1337)).with_fork(Hardfork::Homestead, 200),
            ..old
        };
        let node = FullNode::new(&ctx, dev_config().with_genesis(new.clone()), &MemoryComponents)
            .unwrap();

        assert_eq!(node.blockchain().head().number, 99);
        assert_eq!(node.chain_config(), &new.config);
        assert_eq!(schema::read_chain_config(db.as_ref(), genesis_hash).unwrap(), Some(new.config));
        assert_eq!(schema::read_canonical_hash(db.as_ref(), 100).unwrap(), None);
    }

    #[tokio::test]
    async fn test_genesis_mismatch_is_fatal() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let genesis = test_genesis(ForkSchedule::new(U256::from(1337)));
        FullNode::new(&ctx, dev_config().with_genesis(genesis.clone()), &MemoryComponents)
            .unwrap()
            .stop()
            .unwrap();

        let other = Genesis { timestamp: 1, ..genesis };
        assert!(matches!(
            FullNode::new(&ctx, dev_config().with_genesis(other), &MemoryComponents),
            Err(NodeError::Genesis(_))
        ));
    }

    #[tokio::test]
    async fn test_etherbase_missing() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let node = FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap();

        assert!(matches!(node.etherbase(), Err(NodeError::NoEtherbase)));
        let err = node.start_mining(true).unwrap_err();
        assert_eq!(err.to_string(), "etherbase missing: etherbase must be explicitly specified");
        assert!(!node.is_mining());
    }

    #[tokio::test]
    async fn test_etherbase_cached_without_requery() {
        let store = KeyStore::new("keystore://test");
        let address = store.import_insecure_seed("etherbase").unwrap();
        let accounts = Arc::new(CountingAccounts::default());
        accounts.inner.add_wallet(Arc::new(store));

        let (_, ctx) = context(accounts.clone());
        let node = FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap();

        assert_eq!(node.etherbase().unwrap(), address);
        assert_eq!(node.etherbase().unwrap(), address);
        assert_eq!(accounts.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_set_etherbase_overrides() {
        let (accounts, _) = wallet_with("first");
        let (_, ctx) = context(accounts);
        let node = FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap();

        let explicit = Address::with_last_byte(0x42);
        node.set_etherbase(explicit);
        assert_eq!(node.etherbase().unwrap(), explicit);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_etherbase_reads_see_whole_values() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let node = Arc::new(FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap());
        let a = Address::repeat_byte(0xaa);
        let b = Address::repeat_byte(0xbb);
        node.set_etherbase(a);

        let writer = {
            let node = node.clone();
            std::thread::spawn(move || {
                for i in 0..1_000 {
                    node.set_etherbase(if i % 2 == 0 { b } else { a });
                }
            })
        };
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let node = node.clone();
                std::thread::spawn(move || {
                    for _ in 0..1_000 {
                        let seen = node.etherbase().unwrap();
                        assert!(seen == a || seen == b);
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[tokio::test]
    async fn test_gas_price_reaches_pool() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let node = FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap();
        assert_eq!(node.gas_price(), 18_000_000_000);

        node.set_gas_price(1);
        assert_eq!(node.gas_price(), 1);
        assert_eq!(node.tx_pool().gas_price(), 1);
    }

    #[tokio::test]
    async fn test_start_mining_opens_tx_admission() {
        let (accounts, address) = wallet_with("miner");
        let (_, ctx) = context(accounts);
        let node = FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap();
        node.start(&NetworkServer::new(10)).unwrap();

        assert_eq!(node.protocol_manager().handle_transactions(&[B256::repeat_byte(1)]), 0);
        node.start_mining(true).unwrap();
        assert!(node.is_mining());
        assert_eq!(node.etherbase().unwrap(), address);
        assert_eq!(node.protocol_manager().handle_transactions(&[B256::repeat_byte(1)]), 1);

        node.stop_mining();
        assert!(!node.is_mining());
    }

    fn clique_config(signer: Address) -> NodeConfig {
        dev_config().with_genesis(Genesis::clique_dev(1337, 0, signer))
    }

    #[tokio::test]
    async fn test_clique_requires_local_signer() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let remote = Address::repeat_byte(0x11);
        let node =
            FullNode::new(&ctx, clique_config(remote).with_etherbase(remote), &MemoryComponents)
                .unwrap();
        assert_eq!(node.engine().name(), "clique");

        let err = node.start_mining(false).unwrap_err();
        assert!(matches!(err, NodeError::SignerMissing(_)));
        assert!(err.to_string().starts_with("signer missing"));
        assert!(!node.is_mining());
    }

    #[tokio::test]
    async fn test_clique_authorizes_signer() {
        let (accounts, address) = wallet_with("clique-signer");
        let (_, ctx) = context(accounts);
        let node = FullNode::new(&ctx, clique_config(address), &MemoryComponents).unwrap();

        node.start_mining(false).unwrap();
        let clique = node.engine().as_clique().unwrap();
        assert_eq!(clique.signer(), Some(address));
        assert!(node.is_mining());
    }

    #[tokio::test]
    async fn test_clique_schedule_ignores_pow_mode() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let config = dev_config()
            .with_genesis(test_genesis(ALL_CLIQUE_PROTOCOL_CHANGES.clone()))
            .with_ethash(crate::consensus::EthashConfig {
                pow_mode: PowMode::Shared,
                ..Default::default()
            });
        let node = FullNode::new(&ctx, config, &MemoryComponents).unwrap();
        assert_eq!(
            node.chain_config().engine,
            Some(EngineSchedule::Clique(CliqueConfig { period: 0, epoch: 30_000 }))
        );
        assert!(node.engine().as_clique().is_some());
    }

    #[tokio::test]
    async fn test_protocols_merge_light_server() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let config = dev_config().with_sync_mode(SyncMode::Full).with_light_serving(50, 10);
        let node = FullNode::new(&ctx, config, &MemoryComponents).unwrap();
        assert_eq!(node.protocol_version(), 63);
        assert_eq!(node.protocols().len(), 2);

        let light = Arc::new(LesServer::new());
        node.add_light_server(light.clone());
        assert!(light.has_bloom_indexer());
        let names: Vec<_> = node.protocols().iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["eth", "eth", "les"]);

        node.start(&NetworkServer::new(50)).unwrap();
        assert!(light.is_running());
        node.stop().unwrap();
        assert!(!light.is_running());
    }

    #[tokio::test]
    async fn test_apis() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let node = Arc::new(
            FullNode::new(&ctx, clique_config(Address::ZERO), &MemoryComponents).unwrap(),
        );

        let namespaces = |apis: &[RpcApi]| -> Vec<(&str, bool)> {
            apis.iter().map(|api| (api.namespace, api.public)).collect()
        };
        let before = node.clone().apis();
        assert_eq!(
            namespaces(&before),
            vec![
                ("clique", false),
                ("eth", true),
                ("eth", true),
                ("miner", false),
                ("admin", false),
                ("debug", true),
                ("debug", false),
            ]
        );
        assert!(before[0].service::<CliqueApi>().is_some());
        let debug = before[6].service::<PrivateDebugApi>().unwrap();
        assert_eq!(debug.chain_config(), node.chain_config());
        assert!(debug.rules_at(0).is_active(Hardfork::Byzantium));

        node.start(&NetworkServer::new(30)).unwrap();
        let after = node.clone().apis();
        let net = after.last().unwrap();
        assert_eq!((net.namespace, net.public), ("net", true));
        assert_eq!(net.service::<NetApi>().unwrap().version(), "1337");
    }

    #[tokio::test]
    async fn test_miner_api_start_propagates_gas_price() {
        let (accounts, _) = wallet_with("api-miner");
        let (_, ctx) = context(accounts);
        let node = Arc::new(FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap());
        let apis = node.clone().apis();
        let miner = apis.iter().find_map(|api| api.service::<MinerApi>()).unwrap();

        node.mutable.write().gas_price = 7;
        miner.start(Some(2)).unwrap();
        assert_eq!(node.tx_pool().gas_price(), 7);
        assert_eq!(node.engine().as_ethash().unwrap().threads(), 2);
        assert!(node.is_mining());

        assert!(miner.set_extra("vanity").unwrap());
        assert!(miner.set_extra(&"x".repeat(33)).is_err());
        assert!(miner.stop());
        assert!(!node.is_mining());
        assert_eq!(node.engine().as_ethash().unwrap().threads(), -1);
    }

    #[tokio::test]
    async fn test_bloom_requests_served_after_start() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let node = FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap();
        node.start(&NetworkServer::new(10)).unwrap();

        let (result, answer) = tokio::sync::oneshot::channel();
        node.bloom_requests()
            .send(BloomRetrieval { bit: 1, sections: vec![0], result })
            .await
            .unwrap();
        assert_eq!(answer.await.unwrap(), vec![None]);
        node.stop().unwrap();
    }

    #[tokio::test]
    async fn test_reset_with_genesis_block() {
        let (_, ctx) = context(Arc::new(WalletManager::new()));
        let node = FullNode::new(&ctx, dev_config(), &MemoryComponents).unwrap();
        let genesis = test_genesis(ForkSchedule::new(U256::from(7)));
        node.reset_with_genesis_block(&genesis).unwrap();
        assert_eq!(node.blockchain().head(), ChainHead { number: 0, hash: genesis.hash() });
        assert!(node.is_listening());
        assert_eq!(node.net_version(), 1337);
    }
}
