//! `clique` RPC namespace.

use super::{Clique, CliqueError};
use alloy_primitives::{Address, B256};
use std::{collections::HashMap, sync::Arc};

/// Signer-management endpoints of the clique engine.
#[derive(Debug, Clone)]
pub struct CliqueApi {
    engine: Arc<Clique>,
}

impl CliqueApi {
    /// Create the API over `engine`.
    pub fn new(engine: Arc<Clique>) -> Self {
        Self { engine }
    }

    /// `clique_getSigners`: signer list at checkpoint `hash`.
    pub fn get_signers(&self, hash: B256) -> Result<Vec<Address>, CliqueError> {
        self.engine.signers(hash)
    }

    /// `clique_proposals`: proposals this node is voting for.
    pub fn proposals(&self) -> HashMap<Address, bool> {
        self.engine.proposals()
    }

    /// `clique_propose`: start voting to add (`true`) or drop (`false`) `address`.
    pub fn propose(&self, address: Address, auth: bool) {
        self.engine.propose(address, auth);
    }

    /// `clique_discard`: stop voting on `address`.
    pub fn discard(&self, address: Address) {
        self.engine.discard(address);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chainspec::CliqueConfig, storage::MemoryDatabase};

    #[test]
    fn test_api_drives_engine_proposals() {
        let engine = Arc::new(Clique::new(CliqueConfig::default(), MemoryDatabase::new_arc()));
        let apis = engine.apis();
        assert_eq!(apis.len(), 1);
        assert_eq!(apis[0].namespace, "clique");
        assert!(!apis[0].public);

        let api = apis[0].service::<CliqueApi>().unwrap();
        let candidate = Address::repeat_byte(0x07);
        api.propose(candidate, false);
        assert_eq!(engine.proposals().get(&candidate), Some(&false));
        api.discard(candidate);
        assert!(api.proposals().is_empty());
    }
}
