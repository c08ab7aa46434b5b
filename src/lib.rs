//! N42 Full Node
//!
//! A full node built around a data-driven fork schedule. The schedule decides
//! which protocol rules apply at every height, which consensus engine seals
//! blocks, and how far the local chain must be rewound when a restarted node
//! is handed a schedule that disagrees with the one its database was built
//! with.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                            FullNode                                 │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │                                                                     │
//! │  ┌─────────────────┐     ┌──────────────────┐    ┌──────────────┐   │
//! │  │  ForkSchedule   │────▶│ check_compatible │───▶│ set_head(n)  │   │
//! │  │  (chainspec)    │     │  (rewind point)  │    │ (chain)      │   │
//! │  └────────┬────────┘     └──────────────────┘    └──────────────┘   │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  ┌─────────────────┐     ┌──────────────────┐    ┌──────────────┐   │
//! │  │ create_consensus│────▶│ Ethash | Clique  │───▶│ Miner worker │   │
//! │  │ _engine         │     │ (consensus)      │    │ (miner)      │   │
//! │  └─────────────────┘     └──────────────────┘    └──────────────┘   │
//! │                                                                     │
//! │  ┌──────────────┐  ┌──────────────┐  ┌────────────┐  ┌───────────┐  │
//! │  │ ChainDatabase│  │ TxPool       │  │ eth / les  │  │ Accounts  │  │
//! │  │ (storage)    │  │ Bloom index  │  │ (network)  │  │ (wallets) │  │
//! │  └──────────────┘  └──────────────┘  └────────────┘  └───────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`chainspec`]: Fork schedule, activation rules, compatibility checks, genesis
//! - [`consensus`]: Engine selection, ethash and clique
//! - [`node`]: The full node service, its configuration and RPC descriptors
//! - [`miner`]: Block production driver
//! - [`chain`]: Blockchain, transaction pool, bloom indexer and event mux
//! - [`network`]: Sub-protocols, sync mode and peer budget
//! - [`accounts`]: Wallets and hash signing
//! - [`storage`]: Chain database traits and typed records

#![warn(unused_crate_dependencies)]
// Dependencies used by the binary
use clap as _;
use eyre as _;
use tracing_subscriber as _;

pub mod accounts;
pub mod chain;
pub mod chainspec;
pub mod consensus;
pub mod miner;
pub mod network;
pub mod node;
pub mod storage;

pub use chainspec::{ForkSchedule, Genesis, Hardfork, Rules};
pub use consensus::{create_consensus_engine, Engine};
pub use node::{FullNode, NodeConfig, NodeError, Service};
