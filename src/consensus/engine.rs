//! Consensus engine selection.

use super::{
    clique::Clique,
    ethash::{Ethash, EthashConfig, PowMode, SharedEthash},
};
use crate::{
    chainspec::{EngineSchedule, ForkSchedule},
    node::RpcApi,
    storage::ChainDatabase,
};
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{info, warn};

/// The consensus engine a node runs with.
#[derive(Debug, Clone)]
pub enum Engine {
    /// Proof-of-work.
    Ethash(Arc<Ethash>),
    /// Proof-of-authority.
    Clique(Arc<Clique>),
}

impl Engine {
    /// Short engine name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ethash(_) => "ethash",
            Self::Clique(_) => "clique",
        }
    }

    /// The clique engine, if that is what runs.
    pub fn as_clique(&self) -> Option<&Arc<Clique>> {
        match self {
            Self::Clique(clique) => Some(clique),
            Self::Ethash(_) => None,
        }
    }

    /// The ethash engine, if that is what runs.
    pub fn as_ethash(&self) -> Option<&Arc<Ethash>> {
        match self {
            Self::Ethash(ethash) => Some(ethash),
            Self::Clique(_) => None,
        }
    }

    /// RPC namespaces served by the engine.
    pub fn apis(&self) -> Vec<RpcApi> {
        match self {
            Self::Ethash(ethash) => ethash.apis(),
            Self::Clique(clique) => clique.apis(),
        }
    }
}

/// Builds the consensus engine for `schedule`.
///
/// A clique section in the schedule always selects clique, whatever the pow
/// mode says. Otherwise `config.pow_mode` picks the ethash flavour; the
/// normal mode resolves its cache directory against the data directory and
/// starts with local mining disabled.
pub fn create_consensus_engine<F>(
    schedule: &ForkSchedule,
    config: &EthashConfig,
    shared: &SharedEthash,
    resolve_path: F,
    db: Arc<dyn ChainDatabase>,
) -> Engine
where
    F: Fn(&Path) -> PathBuf,
{
    if let Some(EngineSchedule::Clique(clique)) = &schedule.engine {
        info!(target: "consensus", period = clique.period, epoch = clique.epoch, "Using clique consensus");
        return Engine::Clique(Arc::new(Clique::new(*clique, db)));
    }

    match config.pow_mode {
        PowMode::Fake => {
            warn!(target: "consensus::ethash", "Ethash used in fake mode");
            Engine::Ethash(Arc::new(Ethash::new_faker()))
        }
        PowMode::Test => {
            warn!(target: "consensus::ethash", "Ethash used in test mode");
            Engine::Ethash(Arc::new(Ethash::new_tester()))
        }
        PowMode::Shared => {
            warn!(target: "consensus::ethash", "Ethash used in shared mode");
            Engine::Ethash(shared.get())
        }
        PowMode::Normal => {
            let ethash = Ethash::new(EthashConfig {
                cache_dir: resolve_path(&config.cache_dir),
                ..config.clone()
            });
            ethash.set_threads(-1);
            Engine::Ethash(Arc::new(ethash))
        }
    }
}
