//! Consensus engines.
//!
//! # Selection
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                create_consensus_engine                   │
//! ├──────────────────────────────────────────────────────────┤
//! │                                                          │
//! │  schedule.clique set? ──yes──▶ Clique (period, epoch)    │
//! │          │                                               │
//! │          no                                              │
//! │          ▼                                               │
//! │  pow_mode ──fake────▶ Ethash (accepts every seal)        │
//! │           ──test────▶ Ethash (tiny caches)               │
//! │           ──shared──▶ Ethash (process-wide instance)     │
//! │           ──normal──▶ Ethash (disk caches, no mining)    │
//! │                                                          │
//! └──────────────────────────────────────────────────────────┘
//! ```

pub mod clique;
mod engine;
pub mod ethash;

pub use clique::{Clique, CliqueApi, CliqueError};
pub use engine::{create_consensus_engine, Engine};
pub use ethash::{Ethash, EthashApi, EthashConfig, PowMode, SharedEthash};
