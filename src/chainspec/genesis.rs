//! Genesis block and chain configuration setup.

use super::{
    compat::CompatError,
    schedule::{EngineSchedule, ForkSchedule, ALL_ETHASH_PROTOCOL_CHANGES, MAINNET},
    ScheduleError,
};
use crate::storage::{schema, ChainDatabase, StorageError};
use alloy_primitives::{bytes, keccak256, Address, Bytes, B256, U256};
use alloy_rlp::RlpEncodable;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Hash of the mainnet genesis block.
pub static MAINNET_GENESIS_HASH: Lazy<B256> = Lazy::new(|| Genesis::mainnet().hash());

/// Vanity prefix of clique genesis extra-data.
const CLIQUE_EXTRA_VANITY: usize = 32;

/// Seal suffix of clique genesis extra-data.
const CLIQUE_EXTRA_SEAL: usize = 65;

/// Errors raised while reconciling the supplied genesis with the database.
#[derive(Debug, thiserror::Error)]
pub enum GenesisError {
    /// The database was initialised with a different genesis block.
    #[error("database already contains an incompatible genesis block (have {stored}, new {new})")]
    Mismatch {
        /// Genesis hash found in the database.
        stored: B256,
        /// Hash of the supplied genesis.
        new: B256,
    },

    /// The head record is missing although a genesis is stored.
    #[error("missing block number for head header hash")]
    MissingHead,

    /// The schedule violates the fork ordering rules.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),

    /// Database access failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Genesis specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genesis {
    /// Fork schedule of the chain.
    pub config: ForkSchedule,
    /// Seal nonce.
    #[serde(default)]
    pub nonce: u64,
    /// Timestamp.
    #[serde(default)]
    pub timestamp: u64,
    /// Extra-data. Carries the initial signer list on clique chains.
    #[serde(default)]
    pub extra_data: Bytes,
    /// Gas limit.
    pub gas_limit: u64,
    /// Difficulty.
    pub difficulty: U256,
    /// Mix digest.
    #[serde(default)]
    pub mix_hash: B256,
    /// Beneficiary of the genesis block.
    #[serde(default)]
    pub coinbase: Address,
}

/// Header fields that determine the genesis hash.
#[derive(RlpEncodable)]
struct GenesisHeader<'a> {
    parent_hash: B256,
    coinbase: Address,
    difficulty: U256,
    number: u64,
    gas_limit: u64,
    timestamp: u64,
    extra_data: &'a Bytes,
    mix_hash: B256,
    nonce: u64,
}

impl Genesis {
    /// Mainnet genesis.
    pub fn mainnet() -> Self {
        Self {
            config: MAINNET.clone(),
            nonce: 66,
            timestamp: 0,
            extra_data: bytes!("11bbe8db4e347b4e8c937c1c8370e4b5ed33adb3db69cbdb7a38e1e50b1b82fa"),
            gas_limit: 5000,
            difficulty: U256::from(17_179_869_184u64),
            mix_hash: B256::ZERO,
            coinbase: Address::ZERO,
        }
    }

    /// Single-signer proof-of-authority development genesis.
    pub fn clique_dev(chain_id: u64, period: u64, signer: Address) -> Self {
        let mut extra = vec![0u8; CLIQUE_EXTRA_VANITY];
        extra.extend_from_slice(signer.as_slice());
        extra.extend_from_slice(&[0u8; CLIQUE_EXTRA_SEAL]);

        let config = ForkSchedule::all_from_genesis(U256::from(chain_id))
            .with_engine(EngineSchedule::Clique(super::CliqueConfig { period, epoch: 30_000 }));
        Self {
            config,
            nonce: 0,
            timestamp: 0,
            extra_data: extra.into(),
            gas_limit: 6_283_185,
            difficulty: U256::from(1),
            mix_hash: B256::ZERO,
            coinbase: Address::ZERO,
        }
    }

    /// Keccak hash of the RLP-encoded genesis header.
    pub fn hash(&self) -> B256 {
        let header = GenesisHeader {
            parent_hash: B256::ZERO,
            coinbase: self.coinbase,
            difficulty: self.difficulty,
            number: 0,
            gas_limit: self.gas_limit,
            timestamp: self.timestamp,
            extra_data: &self.extra_data,
            mix_hash: self.mix_hash,
            nonce: self.nonce,
        };
        keccak256(alloy_rlp::encode(&header))
    }

    /// Writes the genesis block records and its schedule. Returns the hash.
    pub fn commit(&self, db: &dyn ChainDatabase) -> Result<B256, GenesisError> {
        self.config.check_fork_order()?;
        let hash = self.hash();
        schema::write_canonical_hash(db, 0, hash)?;
        schema::write_head_block(db, 0, hash)?;
        schema::write_chain_config(db, hash, &self.config)?;
        Ok(hash)
    }
}

/// Outcome of [`setup_genesis`].
#[derive(Debug, Clone)]
pub struct GenesisSetup {
    /// Schedule the node must run with.
    pub config: ForkSchedule,
    /// Genesis hash of the chain in the database.
    pub hash: B256,
    /// Rewind instruction when the new schedule conflicts with imported blocks.
    ///
    /// When present, `config` has not been persisted yet: the caller rewinds
    /// the chain to `rewind_to` and then writes `config` itself.
    pub compat: Option<CompatError>,
}

/// Reconciles the supplied genesis with what the database holds.
///
/// | database          | genesis      | result                                   |
/// |-------------------|--------------|------------------------------------------|
/// | empty             | none         | mainnet committed                        |
/// | empty             | given        | given genesis committed                  |
/// | stored            | none/same    | schedule upgraded if compatible          |
/// | stored            | different    | [`GenesisError::Mismatch`]               |
///
/// A stored custom (non-mainnet) schedule is kept as is when no genesis is
/// supplied.
pub fn setup_genesis(
    db: &dyn ChainDatabase,
    genesis: Option<&Genesis>,
) -> Result<GenesisSetup, GenesisError> {
    let Some(stored) = schema::read_canonical_hash(db, 0)? else {
        let genesis = match genesis {
            Some(genesis) => {
                info!(target: "chainspec", "Writing custom genesis block");
                genesis.clone()
            }
            None => {
                info!(target: "chainspec", "Writing default main-net genesis block");
                Genesis::mainnet()
            }
        };
        let hash = genesis.commit(db)?;
        return Ok(GenesisSetup { config: genesis.config, hash, compat: None });
    };

    if let Some(genesis) = genesis {
        let new = genesis.hash();
        if new != stored {
            return Err(GenesisError::Mismatch { stored, new });
        }
    }

    let new_config = match genesis {
        Some(genesis) => genesis.config.clone(),
        None if stored == *MAINNET_GENESIS_HASH => MAINNET.clone(),
        None => ALL_ETHASH_PROTOCOL_CHANGES.clone(),
    };
    new_config.check_fork_order()?;

    let Some(stored_config) = schema::read_chain_config(db, stored)? else {
        warn!(target: "chainspec", "Found genesis block without chain config");
        schema::write_chain_config(db, stored, &new_config)?;
        return Ok(GenesisSetup { config: new_config, hash: stored, compat: None });
    };

    // Without an explicit genesis, a custom chain keeps its stored schedule.
    if genesis.is_none() && stored != *MAINNET_GENESIS_HASH {
        return Ok(GenesisSetup { config: stored_config, hash: stored, compat: None });
    }

    let height = schema::read_head_number(db)?.ok_or(GenesisError::MissingHead)?;
    if let Some(compat) = stored_config.check_compatible(&new_config, height) {
        if height != 0 && compat.rewind_to != 0 {
            return Ok(GenesisSetup { config: new_config, hash: stored, compat: Some(compat) });
        }
    }
    schema::write_chain_config(db, stored, &new_config)?;
    Ok(GenesisSetup { config: new_config, hash: stored, compat: None })
}
