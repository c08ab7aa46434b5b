//! Peer-to-peer protocol plumbing of the full node.
//!
//! The devp2p server, the `eth` protocol handler and the light (`les`) server
//! are external collaborators. This module holds what the node needs to wire
//! them: the sub-protocol descriptors, the sync mode, the peer budget split
//! between full and light peers, and traits for the two protocol handlers.
//!
//! # Protocols
//!
//! | Name  | Version | Messages | Offered in     |
//! |-------|---------|----------|----------------|
//! | `eth` | 63      | 17       | full, fast     |
//! | `eth` | 62      | 8        | full           |
//! | `les` | 2       | 22       | light serving  |

mod light;
mod protocol;

pub use light::{LesServer, LightServer, LES_PROTOCOL_NAME, LES_VERSIONS};
pub use protocol::{EthProtocolManager, ProtocolManager, ETH_PROTOCOL_NAME, ETH_VERSIONS};

use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// How the chain is synchronised.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    /// Download and execute every block.
    Full,
    /// Download state at a pivot, then execute.
    #[default]
    Fast,
    /// Headers only. Served by a separate light client.
    Light,
}

impl SyncMode {
    /// Lower-case name of the mode.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Fast => "fast",
            Self::Light => "light",
        }
    }
}

/// Unknown sync mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid sync mode {0:?}")]
pub struct InvalidSyncMode(pub String);

impl FromStr for SyncMode {
    type Err = InvalidSyncMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" => Ok(Self::Full),
            "fast" => Ok(Self::Fast),
            "light" => Ok(Self::Light),
            other => Err(InvalidSyncMode(other.to_string())),
        }
    }
}

impl fmt::Display for SyncMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A devp2p sub-protocol offered to peers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Protocol {
    /// Protocol name, e.g. `eth`.
    pub name: &'static str,
    /// Protocol version.
    pub version: u32,
    /// Number of message codes used.
    pub length: u64,
}

/// View of the running p2p server handed to services on start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkServer {
    /// Total peer budget.
    pub max_peers: usize,
}

impl NetworkServer {
    /// Create a server view with the given peer budget.
    pub const fn new(max_peers: usize) -> Self {
        Self { max_peers }
    }
}

/// Peer budget left for full-sync peers.
///
/// When light serving is enabled, light peers are carved out of the total, but
/// full peers always keep at least half of it.
pub fn full_sync_peers(max_peers: usize, light_serving: bool, light_peers: usize) -> usize {
    if !light_serving {
        return max_peers;
    }
    max_peers.saturating_sub(light_peers).max(max_peers / 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sync_peers() {
        assert_eq!(full_sync_peers(50, false, 100), 50);
        assert_eq!(full_sync_peers(50, true, 10), 40);
        // Never below half the budget.
        assert_eq!(full_sync_peers(50, true, 100), 25);
        assert_eq!(full_sync_peers(50, true, 25), 25);
        assert_eq!(full_sync_peers(0, true, 10), 0);
    }

    #[test]
    fn test_sync_mode_parsing() {
        assert_eq!("full".parse::<SyncMode>(), Ok(SyncMode::Full));
        assert_eq!("fast".parse::<SyncMode>(), Ok(SyncMode::Fast));
        assert_eq!("light".parse::<SyncMode>(), Ok(SyncMode::Light));
        assert_eq!("warp".parse::<SyncMode>(), Err(InvalidSyncMode("warp".into())));
        assert_eq!(SyncMode::default().to_string(), "fast");
    }
}
