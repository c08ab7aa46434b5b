//! N42 full node daemon.
//!
//! Runs a [`FullNode`] on in-memory collaborators until Ctrl+C.
//!
//! Usage:
//! ```bash
//! # mainnet schedule, fast sync
//! n42-fullnode --datadir ./data
//!
//! # single-signer clique devnet, mining with a throwaway key
//! n42-fullnode --genesis devnet.json --dev-seed alice --mine
//! ```

use alloy_primitives::Address;
use clap::Parser;
use n42_fullnode::{
    accounts::{KeyStore, WalletManager},
    chainspec::Genesis,
    consensus::PowMode,
    network::{LesServer, NetworkServer},
    node::{FullNode, MemoryComponents, NodeConfig, Service, ServiceContext},
    storage::MemoryDatabaseOpener,
};
use std::{path::PathBuf, sync::Arc};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "n42-fullnode", about = "N42 full node", version)]
struct Cli {
    /// JSON node configuration file.
    #[arg(long, short = 'c', value_name = "PATH", env = "N42_CONFIG")]
    config: Option<PathBuf>,

    /// JSON genesis file committed into an empty database.
    #[arg(long, value_name = "PATH", env = "N42_GENESIS")]
    genesis: Option<PathBuf>,

    /// Data directory that relative paths resolve against.
    #[arg(long, value_name = "PATH", env = "N42_DATADIR")]
    datadir: Option<PathBuf>,

    /// Overrides the network identifier.
    #[arg(long, value_name = "ID")]
    network_id: Option<u64>,

    /// Overrides the sync mode (full, fast).
    #[arg(long, value_name = "MODE")]
    sync_mode: Option<String>,

    /// Overrides the mining beneficiary.
    #[arg(long, value_name = "ADDRESS")]
    etherbase: Option<Address>,

    /// Start mining once the node is up.
    #[arg(long)]
    mine: bool,

    /// Total peer budget.
    #[arg(long, value_name = "N", default_value_t = 25)]
    max_peers: usize,

    /// Percentage of peer slots served to light clients.
    #[arg(long, value_name = "PERCENT")]
    light_serv: Option<u32>,

    /// Maximum number of light peers.
    #[arg(long, value_name = "N")]
    light_peers: Option<usize>,

    /// Overrides the ethash mode (normal, shared, test, fake).
    #[arg(long, value_name = "MODE")]
    pow_mode: Option<PowMode>,

    /// Imports a key derived from this seed. Development only.
    #[arg(long, value_name = "SEED", env = "N42_DEV_SEED")]
    dev_seed: Option<String>,
}

impl Cli {
    fn node_config(&self) -> eyre::Result<NodeConfig> {
        let mut config = match &self.config {
            Some(path) => NodeConfig::load(path)?,
            None => NodeConfig::default(),
        };
        if let Some(path) = &self.genesis {
            let genesis: Genesis = serde_json::from_str(&std::fs::read_to_string(path)?)?;
            config = config.with_genesis(genesis);
        }
        if let Some(network_id) = self.network_id {
            config.network_id = network_id;
        }
        if let Some(sync_mode) = &self.sync_mode {
            config = config.with_sync_mode_name(sync_mode)?;
        }
        if let Some(etherbase) = self.etherbase {
            config.etherbase = etherbase;
        }
        if let Some(light_serv) = self.light_serv {
            config.light_serv = light_serv;
        }
        if let Some(light_peers) = self.light_peers {
            config.light_peers = light_peers;
        }
        if let Some(pow_mode) = self.pow_mode {
            config.ethash.pow_mode = pow_mode;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    let cli = Cli::parse();
    let config = cli.node_config()?;

    let wallets = WalletManager::new();
    if let Some(seed) = &cli.dev_seed {
        let store = KeyStore::new("keystore://dev");
        let address = store.import_insecure_seed(seed)?;
        info!(target: "node", %address, "Imported development key");
        wallets.add_wallet(Arc::new(store));
    }

    let mut ctx = ServiceContext::new(Arc::new(MemoryDatabaseOpener::new()), Arc::new(wallets));
    if let Some(datadir) = &cli.datadir {
        ctx = ctx.with_data_dir(datadir);
    }

    let light_serving = config.light_serv > 0;
    let node = Arc::new(FullNode::new(&ctx, config, &MemoryComponents::default())?);
    if light_serving {
        node.add_light_server(Arc::new(LesServer::new()));
    }

    node.start(&NetworkServer::new(cli.max_peers))?;
    let apis: Vec<_> = node.clone().apis().iter().map(|api| api.namespace).collect();
    info!(target: "node", ?apis, protocols = node.protocols().len(), "Node running");

    if cli.mine {
        node.start_mining(true)?;
    }

    tokio::signal::ctrl_c().await?;
    info!(target: "node", "Received Ctrl+C, shutting down");
    node.stop()?;
    Ok(())
}
