//! Chain configuration: fork schedule, activation rules and genesis setup.
//!
//! # Layout
//!
//! ```text
//!             ┌───────────────┐
//!             │ ForkSchedule  │  (hardfork heights, chain id, engine)
//!             └───────┬───────┘
//!        ┌────────────┼──────────────────┐
//!        ▼            ▼                  ▼
//!  ┌──────────┐ ┌──────────────┐ ┌───────────────┐
//!  │  Rules   │ │ CompatError  │ │ setup_genesis │
//!  │ (height) │ │ (rewind)     │ │ (database)    │
//!  └──────────┘ └──────────────┘ └───────────────┘
//! ```

mod compat;
mod genesis;
mod hardfork;
mod rules;
mod schedule;

pub use compat::CompatError;
pub use genesis::{setup_genesis, Genesis, GenesisError, GenesisSetup, MAINNET_GENESIS_HASH};
pub use hardfork::Hardfork;
pub use rules::Rules;
pub use schedule::{
    CliqueConfig, EngineSchedule, ForkSchedule, ALL_CLIQUE_PROTOCOL_CHANGES,
    ALL_ETHASH_PROTOCOL_CHANGES, MAINNET, TEST_CHAIN_CONFIG,
};

/// Invalid fork schedule.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    /// Both ethash and clique are configured.
    #[error("multiple consensus engines configured")]
    MultipleEngines,

    /// Clique configured with a zero epoch length.
    #[error("clique epoch must be non-zero")]
    ZeroEpoch,

    /// A fork is scheduled before its predecessor.
    #[error(
        "unsupported fork ordering: {predecessor} enabled at {predecessor_height}, but {fork} enabled at {height}"
    )]
    OutOfOrder {
        /// Offending fork.
        fork: Hardfork,
        /// Its height.
        height: u64,
        /// The later-scheduled predecessor.
        predecessor: Hardfork,
        /// Height of the predecessor.
        predecessor_height: u64,
    },
}
