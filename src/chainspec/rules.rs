//! Fork activation queries.
//!
//! Activation is evaluated uniformly for every entry of the fork table: a fork
//! is active at `height` iff it is scheduled and `height >= scheduled`.

use super::{hardfork::Hardfork, schedule::ForkSchedule};
use alloy_primitives::U256;

/// Returns whether a fork scheduled at `scheduled` is active at `head`.
pub(crate) fn is_forked(scheduled: Option<u64>, head: u64) -> bool {
    scheduled.is_some_and(|scheduled| scheduled <= head)
}

impl ForkSchedule {
    /// Returns whether `fork` is active at `height`.
    pub fn is_active(&self, fork: Hardfork, height: u64) -> bool {
        is_forked(self.fork_block(fork), height)
    }

    /// Snapshots every activation flag at `height`.
    pub fn rules_at(&self, height: u64) -> Rules {
        let mut active = [false; Hardfork::COUNT];
        for fork in Hardfork::ALL {
            active[fork.index()] = self.is_active(fork, height);
        }
        Rules { chain_id: self.chain_id.unwrap_or_default(), height, active }
    }
}

/// Point-in-time view of the fork schedule.
///
/// A `Rules` value describes exactly one height. Callers crossing a fork
/// boundary must compute a fresh one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rules {
    /// Chain id, zero when the schedule has none.
    pub chain_id: U256,
    /// Height the snapshot was taken at.
    pub height: u64,
    active: [bool; Hardfork::COUNT],
}

impl Rules {
    /// Returns whether `fork` was active when the snapshot was taken.
    pub fn is_active(&self, fork: Hardfork) -> bool {
        self.active[fork.index()]
    }

    /// Forks active in this snapshot, in protocol order.
    pub fn active_forks(&self) -> impl Iterator<Item = Hardfork> + '_ {
        Hardfork::ALL.into_iter().filter(|fork| self.is_active(*fork))
    }
}
