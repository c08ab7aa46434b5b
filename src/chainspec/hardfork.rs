//! Protocol upgrade table.
//!
//! Every scheduled fork is a variant of [`Hardfork`]. The variant order is the
//! protocol-introduction order, which is also the order the compatibility checker
//! walks the boundaries in. Adding a fork means adding a variant here, an entry
//! in [`Hardfork::ALL`] and a persisted field in the schedule record; the
//! activation and compatibility logic never needs to change.

use std::fmt;

/// A height-triggered protocol rule change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Hardfork {
    /// Homestead.
    Homestead,
    /// The contested DAO fork. Nodes may support or oppose it.
    Dao,
    /// Gas repricing for IO-heavy operations.
    Eip150,
    /// Replay protection.
    Eip155,
    /// State clearing.
    Eip158,
    /// Byzantium.
    Byzantium,
}

impl Hardfork {
    /// All forks in protocol-introduction order.
    pub const ALL: [Self; 6] = [
        Self::Homestead,
        Self::Dao,
        Self::Eip150,
        Self::Eip155,
        Self::Eip158,
        Self::Byzantium,
    ];

    /// Number of known forks.
    pub const COUNT: usize = Self::ALL.len();

    /// Position of the fork in [`Hardfork::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human readable name, used in logs and compatibility errors.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Homestead => "Homestead",
            Self::Dao => "DAO",
            Self::Eip150 => "EIP150",
            Self::Eip155 => "EIP155",
            Self::Eip158 => "EIP158",
            Self::Byzantium => "Byzantium",
        }
    }

    /// Field name of the activation height in the persisted schedule.
    pub const fn json_key(self) -> &'static str {
        match self {
            Self::Homestead => "homesteadBlock",
            Self::Dao => "daoForkBlock",
            Self::Eip150 => "eip150Block",
            Self::Eip155 => "eip155Block",
            Self::Eip158 => "eip158Block",
            Self::Byzantium => "byzantiumBlock",
        }
    }

    /// Optional forks may be left unscheduled without constraining later forks.
    pub const fn is_optional(self) -> bool {
        matches!(self, Self::Dao)
    }
}

impl fmt::Display for Hardfork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_order_matches_variant_order() {
        for (i, fork) in Hardfork::ALL.iter().enumerate() {
            assert_eq!(fork.index(), i);
        }
        assert!(Hardfork::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_only_dao_is_optional() {
        let optional: Vec<_> = Hardfork::ALL.into_iter().filter(|f| f.is_optional()).collect();
        assert_eq!(optional, vec![Hardfork::Dao]);
    }
}
