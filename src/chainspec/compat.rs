//! Stored-versus-supplied schedule reconciliation.
//!
//! When a node restarts with a different schedule than the one its database was
//! built with, any fork boundary that is already behind the head and has moved
//! would reinterpret imported history. The checker finds the lowest such
//! boundary and reports how far the chain must be rewound.

use super::{
    hardfork::Hardfork,
    rules::is_forked,
    schedule::ForkSchedule,
};
use std::fmt;

/// A fork whose activation differs between the stored and the new schedule in a
/// way that would alter already imported blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompatError {
    /// Which boundary conflicts.
    pub what: String,
    /// Height in the stored schedule.
    pub stored: Option<u64>,
    /// Height in the new schedule.
    pub new: Option<u64>,
    /// Height the local chain must be rewound to.
    pub rewind_to: u64,
}

impl CompatError {
    fn new(what: impl Into<String>, stored: Option<u64>, new: Option<u64>) -> Self {
        let rewind = match (stored, new) {
            (None, new) => new,
            (Some(stored), None) => Some(stored),
            (Some(stored), Some(new)) => Some(stored.min(new)),
        };
        Self {
            what: what.into(),
            stored,
            new,
            rewind_to: rewind.map_or(0, |height| height.saturating_sub(1)),
        }
    }
}

struct Num(Option<u64>);

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(n) => write!(f, "{n}"),
            None => f.write_str("<nil>"),
        }
    }
}

impl fmt::Display for CompatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mismatching {} in database (have {}, want {}, rewindto {})",
            self.what,
            Num(self.stored),
            Num(self.new),
            self.rewind_to
        )
    }
}

impl std::error::Error for CompatError {}

/// A fork scheduled at `stored` cannot be moved to `new` once either schedule
/// has it active at `head`.
fn is_fork_incompatible(stored: Option<u64>, new: Option<u64>, head: u64) -> bool {
    (is_forked(stored, head) || is_forked(new, head)) && stored != new
}

impl ForkSchedule {
    /// Checks whether `new` can replace `self` for a chain whose head is at
    /// `height`.
    ///
    /// The check is repeated with the head moved to each reported rewind point
    /// until the rewind point stops changing, so the result is the lowest
    /// conflicting boundary rather than the first one seen at the original head.
    pub fn check_compatible(&self, new: &ForkSchedule, height: u64) -> Option<CompatError> {
        let mut head = height;
        let mut last: Option<CompatError> = None;
        while let Some(err) = self.check_compatible_at(new, head) {
            if last.as_ref().is_some_and(|last| last.rewind_to == err.rewind_to) {
                break;
            }
            head = err.rewind_to;
            last = Some(err);
        }
        last
    }

    /// Single pass over the fork boundaries at `head`, earliest fork first.
    fn check_compatible_at(&self, new: &ForkSchedule, head: u64) -> Option<CompatError> {
        for fork in Hardfork::ALL {
            let (stored_block, new_block) = (self.fork_block(fork), new.fork_block(fork));
            if is_fork_incompatible(stored_block, new_block, head) {
                return Some(CompatError::new(
                    format!("{} fork block", fork.name()),
                    stored_block,
                    new_block,
                ));
            }
            match fork {
                Hardfork::Dao
                    if self.is_active(Hardfork::Dao, head)
                        && self.dao_fork_support != new.dao_fork_support =>
                {
                    return Some(CompatError::new(
                        "DAO fork support flag",
                        stored_block,
                        new_block,
                    ));
                }
                Hardfork::Eip158
                    if self.is_active(Hardfork::Eip158, head) && self.chain_id != new.chain_id =>
                {
                    return Some(CompatError::new("EIP158 chain ID", stored_block, new_block));
                }
                _ => {}
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chainspec::{EngineSchedule, ALL_ETHASH_PROTOCOL_CHANGES, MAINNET};
    use alloy_primitives::U256;

    fn schedule() -> ForkSchedule {
        ForkSchedule::new(U256::from(1)).with_engine(EngineSchedule::Ethash)
    }

    #[test]
    fn test_identical_schedules_never_conflict() {
        for head in [0, 1, 2_848_949, 2_848_950, 5_000_000, u64::MAX] {
            assert_eq!(MAINNET.check_compatible(&MAINNET, head), None);
        }
    }

    #[test]
    fn test_moved_fork_rewinds_below_earlier_height() {
        let stored = schedule().with_fork(Hardfork::Homestead, 100);
        let new = schedule().with_fork(Hardfork::Homestead, 200);

        let err = stored.check_compatible(&new, 150).unwrap();
        assert_eq!(err.what, "Homestead fork block");
        assert_eq!(err.stored, Some(100));
        assert_eq!(err.new, Some(200));
        assert_eq!(err.rewind_to, 99);
    }

    #[test]
    fn test_future_fork_may_move() {
        let stored = schedule().with_fork(Hardfork::Homestead, 100);
        let new = schedule().with_fork(Hardfork::Homestead, 200);
        assert_eq!(stored.check_compatible(&new, 50), None);
    }

    #[test]
    fn test_unscheduled_in_store_rewinds_to_new_height() {
        let stored = schedule();
        let new = schedule().with_fork(Hardfork::Byzantium, 30);

        let err = stored.check_compatible(&new, 40).unwrap();
        assert_eq!(err.stored, None);
        assert_eq!(err.rewind_to, 29);
    }

    #[test]
    fn test_removed_fork_rewinds_to_stored_height() {
        let stored = schedule().with_fork(Hardfork::Eip155, 30);
        let new = schedule();

        let err = stored.check_compatible(&new, 40).unwrap();
        assert_eq!(err.new, None);
        assert_eq!(err.rewind_to, 29);
    }

    #[test]
    fn test_genesis_fork_rewinds_to_zero() {
        let stored = schedule().with_fork(Hardfork::Homestead, 0);
        let new = schedule().with_fork(Hardfork::Homestead, 5);
        assert_eq!(stored.check_compatible(&new, 10).unwrap().rewind_to, 0);
    }

    #[test]
    fn test_earliest_fork_conflict_reported() {
        let stored = schedule()
            .with_fork(Hardfork::Homestead, 40)
            .with_fork(Hardfork::Eip150, 70)
            .with_fork(Hardfork::Byzantium, 90);
        let new = schedule()
            .with_fork(Hardfork::Homestead, 50)
            .with_fork(Hardfork::Eip150, 60)
            .with_fork(Hardfork::Byzantium, 95);

        let err = stored.check_compatible(&new, 100).unwrap();
        assert_eq!(err.what, "Homestead fork block");
        assert_eq!(err.rewind_to, 39);
    }

    #[test]
    fn test_iteration_descends_through_boundaries() {
        // Head 100: Homestead (80 vs 90) conflicts first, rewind 79.
        // Head 79: Homestead is inactive under both, but Eip155 (50 vs 60)
        // now surfaces, rewind 49. Head 49: nothing conflicts.
        let stored = schedule()
            .with_fork(Hardfork::Homestead, 80)
            .with_fork(Hardfork::Eip155, 50);
        let new = schedule()
            .with_fork(Hardfork::Homestead, 90)
            .with_fork(Hardfork::Eip155, 60);

        let err = stored.check_compatible(&new, 100).unwrap();
        assert_eq!(err.what, "EIP155 fork block");
        assert_eq!(err.rewind_to, 49);
    }

    #[test]
    fn test_iteration_bounded_by_boundary_count() {
        // Each boundary conflicts and each is lower than the previous one, so
        // every pass surfaces a new conflict until the last boundary.
        let mut stored = schedule();
        let mut new = schedule();
        for (i, fork) in Hardfork::ALL.into_iter().enumerate() {
            let height = 1_000 - 100 * i as u64;
            stored = stored.with_fork(fork, height);
            new = new.with_fork(fork, height + 10);
        }

        let err = stored.check_compatible(&new, 2_000).unwrap();
        assert_eq!(err.what, "Byzantium fork block");
        assert_eq!(err.rewind_to, 499);
    }

    #[test]
    fn test_dao_support_flag_only_checked_once_active() {
        let stored = schedule().with_fork(Hardfork::Dao, 10).with_dao_fork_support(true);
        let new = stored.clone().with_dao_fork_support(false);

        assert_eq!(stored.check_compatible(&new, 9), None);

        let err = stored.check_compatible(&new, 10).unwrap();
        assert_eq!(err.what, "DAO fork support flag");
        assert_eq!(err.rewind_to, 9);
    }

    #[test]
    fn test_chain_id_change_after_eip158() {
        let stored = ALL_ETHASH_PROTOCOL_CHANGES.clone();
        let new = stored.clone().with_chain_id(Some(U256::from(1338)));

        let err = stored.check_compatible(&new, 5).unwrap();
        assert_eq!(err.what, "EIP158 chain ID");
        assert_eq!(err.rewind_to, 0);
    }

    #[test]
    fn test_error_message() {
        let err = CompatError::new("Homestead fork block", Some(100), None);
        assert_eq!(
            err.to_string(),
            "mismatching Homestead fork block in database (have 100, want <nil>, rewindto 99)"
        );
    }
}
