//! Fork schedule: the chain configuration stored alongside the genesis block.

use super::{hardfork::Hardfork, ScheduleError};
use alloy_primitives::{b256, B256, U256};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Mainnet fork schedule.
pub static MAINNET: Lazy<ForkSchedule> = Lazy::new(|| {
    ForkSchedule::new(U256::from(1))
        .with_fork(Hardfork::Dao, 0)
        .with_dao_fork_support(false)
        .with_fork(Hardfork::Eip150, 0)
        .with_eip150_hash(b256!(
            "2086799aeebeae135c246c65021c82b4e15a2c451340993aacfd2751886514f0"
        ))
        .with_fork(Hardfork::Eip155, 0)
        .with_fork(Hardfork::Eip158, 0)
        .with_fork(Hardfork::Byzantium, 2_848_950)
        .with_engine(EngineSchedule::Ethash)
});

/// Every fork active from genesis, proof-of-work sealing.
pub static ALL_ETHASH_PROTOCOL_CHANGES: Lazy<ForkSchedule> = Lazy::new(|| {
    ForkSchedule::all_from_genesis(U256::from(1337)).with_engine(EngineSchedule::Ethash)
});

/// Every fork active from genesis, proof-of-authority sealing.
pub static ALL_CLIQUE_PROTOCOL_CHANGES: Lazy<ForkSchedule> = Lazy::new(|| {
    ForkSchedule::all_from_genesis(U256::from(1337))
        .with_engine(EngineSchedule::Clique(CliqueConfig { period: 0, epoch: 30_000 }))
});

/// Schedule used by unit tests across the crate.
pub static TEST_CHAIN_CONFIG: Lazy<ForkSchedule> = Lazy::new(|| {
    ForkSchedule::all_from_genesis(U256::from(1)).with_engine(EngineSchedule::Ethash)
});

/// Clique configuration parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliqueConfig {
    /// Number of seconds between blocks to enforce.
    pub period: u64,
    /// Epoch length to reset votes and checkpoint.
    pub epoch: u64,
}

impl Default for CliqueConfig {
    fn default() -> Self {
        Self { period: 15, epoch: 30_000 }
    }
}

/// Consensus engine sub-configuration carried by a schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineSchedule {
    /// Proof-of-work. Persisted as an empty object.
    Ethash,
    /// Proof-of-authority.
    Clique(CliqueConfig),
}

impl EngineSchedule {
    /// Engine family name.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Ethash => "ethash",
            Self::Clique(_) => "clique",
        }
    }
}

/// Ordered fork activation heights plus the engine sub-config.
///
/// Created once from genesis input, persisted next to the genesis hash and only
/// replaced through [`setup_genesis`](super::setup_genesis) after the
/// compatibility check. It is treated as immutable by everything downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleRecord", into = "ScheduleRecord")]
pub struct ForkSchedule {
    /// Chain identifier used for replay protection.
    pub chain_id: Option<U256>,
    /// Whether this node supports the contested DAO fork.
    pub dao_fork_support: bool,
    /// EIP150 fork hash, needed by header-only clients.
    pub eip150_hash: B256,
    /// Engine sub-config. At most one engine is configured.
    pub engine: Option<EngineSchedule>,
    /// Activation heights indexed by [`Hardfork::index`].
    heights: [Option<u64>; Hardfork::COUNT],
}

impl ForkSchedule {
    /// Creates a schedule with no forks and no engine.
    pub fn new(chain_id: U256) -> Self {
        Self {
            chain_id: Some(chain_id),
            dao_fork_support: false,
            eip150_hash: B256::ZERO,
            engine: None,
            heights: [None; Hardfork::COUNT],
        }
    }

    /// Creates a schedule with every non-optional fork active from genesis.
    pub fn all_from_genesis(chain_id: U256) -> Self {
        Hardfork::ALL
            .into_iter()
            .filter(|fork| !fork.is_optional())
            .fold(Self::new(chain_id), |schedule, fork| schedule.with_fork(fork, 0))
    }

    /// Schedules `fork` at `height`.
    pub fn with_fork(mut self, fork: Hardfork, height: u64) -> Self {
        self.heights[fork.index()] = Some(height);
        self
    }

    /// Removes `fork` from the schedule.
    pub fn without_fork(mut self, fork: Hardfork) -> Self {
        self.heights[fork.index()] = None;
        self
    }

    /// Sets the DAO support flag.
    pub fn with_dao_fork_support(mut self, support: bool) -> Self {
        self.dao_fork_support = support;
        self
    }

    /// Sets the EIP150 hash.
    pub fn with_eip150_hash(mut self, hash: B256) -> Self {
        self.eip150_hash = hash;
        self
    }

    /// Sets the engine sub-config.
    pub fn with_engine(mut self, engine: EngineSchedule) -> Self {
        self.engine = Some(engine);
        self
    }

    /// Sets or clears the chain identifier.
    pub fn with_chain_id(mut self, chain_id: Option<U256>) -> Self {
        self.chain_id = chain_id;
        self
    }

    /// Scheduled activation height of `fork`, `None` if never scheduled.
    pub fn fork_block(&self, fork: Hardfork) -> Option<u64> {
        self.heights[fork.index()]
    }

    /// Iterates `(fork, height)` pairs in protocol order.
    pub fn forks(&self) -> impl Iterator<Item = (Hardfork, Option<u64>)> + '_ {
        Hardfork::ALL.into_iter().map(|fork| (fork, self.fork_block(fork)))
    }

    /// Clique sub-config, if this is a proof-of-authority chain.
    pub fn clique(&self) -> Option<&CliqueConfig> {
        match &self.engine {
            Some(EngineSchedule::Clique(config)) => Some(config),
            _ => None,
        }
    }

    /// Verifies that scheduled forks appear in non-decreasing height order.
    ///
    /// Unscheduled and optional forks are skipped, so a gap in the schedule is
    /// fine as long as the scheduled heights never go backwards.
    pub fn check_fork_order(&self) -> Result<(), ScheduleError> {
        let mut last: Option<(Hardfork, u64)> = None;
        for (fork, height) in self.forks() {
            let Some(height) = height.filter(|_| !fork.is_optional()) else {
                continue;
            };
            if let Some((predecessor, predecessor_height)) = last {
                if predecessor_height > height {
                    return Err(ScheduleError::OutOfOrder {
                        fork,
                        height,
                        predecessor,
                        predecessor_height,
                    });
                }
            }
            last = Some((fork, height));
        }
        Ok(())
    }
}

struct Height(Option<u64>);

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(height) => write!(f, "{height}"),
            None => f.write_str("<nil>"),
        }
    }
}

impl fmt::Display for ForkSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.chain_id {
            Some(id) => write!(f, "{{ChainID: {id}")?,
            None => f.write_str("{ChainID: <nil>")?,
        }
        for (fork, height) in self.forks() {
            write!(f, " {}: {}", fork.name(), Height(height))?;
            if fork == Hardfork::Dao {
                write!(f, " DAOSupport: {}", self.dao_fork_support)?;
            }
        }
        let engine = self.engine.as_ref().map_or("unknown", EngineSchedule::name);
        write!(f, " Engine: {engine}}}")
    }
}

/// Proof-of-work marker, persisted as `{}`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
struct EthashMarker {}

/// Persisted form of a [`ForkSchedule`].
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleRecord {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "chain_id_serde")]
    chain_id: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    homestead_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dao_fork_block: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    dao_fork_support: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    eip150_block: Option<u64>,
    #[serde(default, skip_serializing_if = "B256::is_zero")]
    eip150_hash: B256,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    eip155_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    eip158_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    byzantium_block: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ethash: Option<EthashMarker>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    clique: Option<CliqueConfig>,
}

impl ScheduleRecord {
    fn height_mut(&mut self, fork: Hardfork) -> &mut Option<u64> {
        match fork {
            Hardfork::Homestead => &mut self.homestead_block,
            Hardfork::Dao => &mut self.dao_fork_block,
            Hardfork::Eip150 => &mut self.eip150_block,
            Hardfork::Eip155 => &mut self.eip155_block,
            Hardfork::Eip158 => &mut self.eip158_block,
            Hardfork::Byzantium => &mut self.byzantium_block,
        }
    }
}

impl TryFrom<ScheduleRecord> for ForkSchedule {
    type Error = ScheduleError;

    fn try_from(mut record: ScheduleRecord) -> Result<Self, Self::Error> {
        let engine = match (record.ethash, record.clique) {
            (Some(_), Some(_)) => return Err(ScheduleError::MultipleEngines),
            (Some(_), None) => Some(EngineSchedule::Ethash),
            (None, Some(clique)) if clique.epoch == 0 => return Err(ScheduleError::ZeroEpoch),
            (None, Some(clique)) => Some(EngineSchedule::Clique(clique)),
            (None, None) => None,
        };
        let mut heights = [None; Hardfork::COUNT];
        for fork in Hardfork::ALL {
            heights[fork.index()] = *record.height_mut(fork);
        }
        Ok(Self {
            chain_id: record.chain_id,
            dao_fork_support: record.dao_fork_support,
            eip150_hash: record.eip150_hash,
            engine,
            heights,
        })
    }
}

impl From<ForkSchedule> for ScheduleRecord {
    fn from(schedule: ForkSchedule) -> Self {
        let mut record = Self {
            chain_id: schedule.chain_id,
            dao_fork_support: schedule.dao_fork_support,
            eip150_hash: schedule.eip150_hash,
            ..Default::default()
        };
        for (fork, height) in schedule.forks() {
            *record.height_mut(fork) = height;
        }
        match schedule.engine {
            Some(EngineSchedule::Ethash) => record.ethash = Some(EthashMarker {}),
            Some(EngineSchedule::Clique(clique)) => record.clique = Some(clique),
            None => {}
        }
        record
    }
}

/// Chain ids are written as JSON numbers when they fit in 64 bits and as
/// decimal strings otherwise. Both forms, plus `0x` hex strings, are accepted.
mod chain_id_serde {
    use alloy_primitives::U256;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u64),
        String(String),
    }

    pub(super) fn serialize<S: Serializer>(
        value: &Option<U256>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(id) if id.bit_len() <= 64 => serializer.serialize_u64(id.as_limbs()[0]),
            Some(id) => serializer.serialize_str(&id.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<U256>, D::Error> {
        Option::<Repr>::deserialize(deserializer)?
            .map(|repr| match repr {
                Repr::Number(n) => Ok(U256::from(n)),
                Repr::String(s) => s.parse::<U256>().map_err(D::Error::custom),
            })
            .transpose()
    }
}
