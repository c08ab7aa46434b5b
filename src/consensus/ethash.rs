//! Ethash proof-of-work engine handle.
//!
//! Only the parts the node wires up live here: the operating mode, cache and
//! dataset retention settings, the mining thread count and the per-epoch seed
//! hash cache. Hashimoto itself belongs to the sealing backend.

use crate::node::RpcApi;
use alloy_primitives::{keccak256, B256};
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::{
    num::NonZeroUsize,
    path::PathBuf,
    str::FromStr,
    sync::{
        atomic::{AtomicI32, Ordering},
        Arc, Weak,
    },
};
use tracing::debug;

/// Blocks per ethash epoch.
pub const EPOCH_LENGTH: u64 = 30_000;

/// How the ethash engine verifies and produces seals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum PowMode {
    /// Full verification with on-disk caches and datasets.
    #[default]
    Normal,
    /// One engine instance reused by every node in the process.
    Shared,
    /// Low difficulty, tiny caches, deterministic.
    Test,
    /// Accepts every seal.
    Fake,
}

impl PowMode {
    /// Lower-case name of the mode.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Shared => "shared",
            Self::Test => "test",
            Self::Fake => "fake",
        }
    }
}

impl FromStr for PowMode {
    type Err = std::convert::Infallible;

    /// Unknown names select [`PowMode::Normal`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.to_ascii_lowercase().as_str() {
            "shared" => Self::Shared,
            "test" => Self::Test,
            "fake" => Self::Fake,
            _ => Self::Normal,
        })
    }
}

impl From<String> for PowMode {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl std::fmt::Display for PowMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ethash cache and dataset settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EthashConfig {
    /// Verification cache directory, relative to the data directory.
    pub cache_dir: PathBuf,
    /// Verification caches kept in memory.
    pub caches_in_mem: usize,
    /// Verification caches kept on disk.
    pub caches_on_disk: usize,
    /// Mining dataset directory.
    pub dataset_dir: PathBuf,
    /// Mining datasets kept in memory.
    pub datasets_in_mem: usize,
    /// Mining datasets kept on disk.
    pub datasets_on_disk: usize,
    /// Operating mode.
    pub pow_mode: PowMode,
}

impl Default for EthashConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("ethash"),
            caches_in_mem: 2,
            caches_on_disk: 3,
            dataset_dir: PathBuf::from(".ethash"),
            datasets_in_mem: 1,
            datasets_on_disk: 2,
            pow_mode: PowMode::Normal,
        }
    }
}

/// Ethash engine.
#[derive(Debug)]
pub struct Ethash {
    config: EthashConfig,
    /// Seed hashes by epoch.
    caches: Mutex<LruCache<u64, B256>>,
    /// Local mining threads; negative disables local mining.
    threads: AtomicI32,
    hashrate: RwLock<f64>,
}

impl Ethash {
    /// Create an engine with the given settings.
    pub fn new(config: EthashConfig) -> Self {
        let capacity = NonZeroUsize::new(config.caches_in_mem).unwrap_or(NonZeroUsize::MIN);
        Self {
            config,
            caches: Mutex::new(LruCache::new(capacity)),
            threads: AtomicI32::new(0),
            hashrate: RwLock::new(0.0),
        }
    }

    /// Tiny in-memory engine for tests.
    pub fn new_tester() -> Self {
        Self::new(EthashConfig {
            cache_dir: PathBuf::new(),
            caches_in_mem: 1,
            caches_on_disk: 0,
            dataset_dir: PathBuf::new(),
            datasets_in_mem: 1,
            datasets_on_disk: 0,
            pow_mode: PowMode::Test,
        })
    }

    /// Engine that accepts every seal.
    pub fn new_faker() -> Self {
        Self::new(EthashConfig { pow_mode: PowMode::Fake, ..Self::new_tester().config })
    }

    /// Operating mode.
    pub fn mode(&self) -> PowMode {
        self.config.pow_mode
    }

    /// Effective settings.
    pub fn config(&self) -> &EthashConfig {
        &self.config
    }

    /// Whether seal verification is skipped.
    pub fn is_fake(&self) -> bool {
        self.config.pow_mode == PowMode::Fake
    }

    /// Number of local mining threads.
    pub fn threads(&self) -> i32 {
        self.threads.load(Ordering::Acquire)
    }

    /// Sets the number of local mining threads. `0` uses all cores, a negative
    /// value disables local mining.
    pub fn set_threads(&self, threads: i32) {
        self.threads.store(threads, Ordering::Release);
        debug!(target: "consensus::ethash", threads, "Updated mining threads");
    }

    /// Last reported hashrate.
    pub fn hashrate(&self) -> f64 {
        *self.hashrate.read()
    }

    /// Records a hashrate report.
    pub fn submit_hashrate(&self, rate: f64) {
        *self.hashrate.write() = rate;
    }

    /// Seed hash of the epoch containing `block`.
    pub fn seed_hash(&self, block: u64) -> B256 {
        let epoch = block / EPOCH_LENGTH;
        if let Some(seed) = self.caches.lock().get(&epoch) {
            return *seed;
        }
        let seed = (0..epoch).fold(B256::ZERO, |seed, _| keccak256(seed));
        self.caches.lock().put(epoch, seed);
        debug!(target: "consensus::ethash", epoch, %seed, "Generated ethash seed");
        seed
    }

    /// Number of epochs currently cached.
    pub fn cached_epochs(&self) -> usize {
        self.caches.lock().len()
    }

    /// RPC namespaces served by the engine.
    pub fn apis(self: &Arc<Self>) -> Vec<RpcApi> {
        vec![RpcApi::new("ethash", "1.0", EthashApi { engine: self.clone() }, true)]
    }
}

/// `ethash` RPC namespace.
#[derive(Debug, Clone)]
pub struct EthashApi {
    engine: Arc<Ethash>,
}

impl EthashApi {
    /// `ethash_getHashrate`.
    pub fn get_hashrate(&self) -> f64 {
        self.engine.hashrate()
    }

    /// `ethash_submitHashrate`.
    pub fn submit_hashrate(&self, rate: f64) -> bool {
        self.engine.submit_hashrate(rate);
        true
    }
}

/// Factory for the process-wide [`PowMode::Shared`] engine.
///
/// Hands out the live instance while any node still holds it and builds a new
/// one once all of them are gone.
#[derive(Debug, Default)]
pub struct SharedEthash {
    instance: Mutex<Weak<Ethash>>,
}

impl SharedEthash {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the shared engine.
    pub fn get(&self) -> Arc<Ethash> {
        let mut instance = self.instance.lock();
        if let Some(engine) = instance.upgrade() {
            return engine;
        }
        let engine = Arc::new(Ethash::new(EthashConfig {
            pow_mode: PowMode::Shared,
            ..Ethash::new_tester().config
        }));
        *instance = Arc::downgrade(&engine);
        engine
    }
}
