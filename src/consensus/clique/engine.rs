//! Clique proof-of-authority consensus engine implementation.

use super::{
    api::CliqueApi, error::CliqueError, CLIQUE_CHECKPOINT_PREFIX, EXTRA_SEAL, EXTRA_VANITY,
    INMEMORY_SIGNATURES,
};
use crate::{
    accounts::{recover_address, SignFn},
    chainspec::CliqueConfig,
    node::RpcApi,
    storage::ChainDatabase,
};
use alloy_primitives::{keccak256, Address, Bytes, B256};
use alloy_rlp::RlpEncodable;
use lru::LruCache;
use parking_lot::{Mutex, RwLock};
use std::{collections::HashMap, num::NonZeroUsize, sync::Arc};
use tracing::{debug, info};

/// Minimal header data needed for sealing and seal verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderData {
    /// Block number.
    pub number: u64,
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Block beneficiary.
    pub coinbase: Address,
    /// Header nonce, covered by the seal.
    pub nonce: [u8; 8],
    /// Vanity prefix, signer list on checkpoint blocks, then the 65-byte seal.
    pub extra: Bytes,
    /// Block timestamp in seconds.
    pub time: u64,
    /// Block difficulty.
    pub difficulty: u64,
}

/// Header fields covered by the seal.
#[derive(RlpEncodable)]
struct SealFields<'a> {
    parent_hash: B256,
    coinbase: Address,
    difficulty: u64,
    number: u64,
    time: u64,
    extra: &'a [u8],
    nonce: [u8; 8],
}

impl HeaderData {
    /// Extract signers from checkpoint block extra-data.
    pub fn checkpoint_signers(&self) -> Result<Vec<Address>, CliqueError> {
        if self.extra.len() < EXTRA_VANITY {
            return Err(CliqueError::MissingVanity);
        }
        if self.extra.len() < EXTRA_VANITY + EXTRA_SEAL {
            return Err(CliqueError::MissingSignature);
        }

        let signers_bytes = &self.extra[EXTRA_VANITY..self.extra.len() - EXTRA_SEAL];
        if signers_bytes.len() % 20 != 0 {
            return Err(CliqueError::InvalidCheckpointSigners);
        }

        Ok(signers_bytes.chunks(20).map(Address::from_slice).collect())
    }

    /// Get the signature from extra-data.
    pub fn signature(&self) -> Result<&[u8], CliqueError> {
        if self.extra.len() < EXTRA_SEAL {
            return Err(CliqueError::MissingSignature);
        }
        Ok(&self.extra[self.extra.len() - EXTRA_SEAL..])
    }

    /// Hash of the header without the seal, i.e. what the signer signs.
    pub fn seal_hash(&self) -> B256 {
        let unsealed = self.extra.len().saturating_sub(EXTRA_SEAL);
        let fields = SealFields {
            parent_hash: self.parent_hash,
            coinbase: self.coinbase,
            difficulty: self.difficulty,
            number: self.number,
            time: self.time,
            extra: &self.extra[..unsealed],
            nonce: self.nonce,
        };
        keccak256(alloy_rlp::encode(&fields))
    }
}

/// Local signer: address plus the function producing its signatures.
struct Signer {
    address: Address,
    sign_fn: SignFn,
}

/// Clique proof-of-authority consensus engine.
pub struct Clique {
    /// Consensus engine configuration.
    config: CliqueConfig,

    /// Database to store and retrieve signer checkpoints.
    db: Arc<dyn ChainDatabase>,

    /// Signatures of recent blocks, keyed by seal hash.
    signatures: Mutex<LruCache<B256, Address>>,

    /// Current list of proposals we are pushing.
    proposals: RwLock<HashMap<Address, bool>>,

    /// Local signing key.
    signer: RwLock<Option<Signer>>,
}

impl std::fmt::Debug for Clique {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Clique")
            .field("config", &self.config)
            .field("signer", &self.signer())
            .finish_non_exhaustive()
    }
}

impl Clique {
    /// Create a new Clique consensus engine.
    pub fn new(config: CliqueConfig, db: Arc<dyn ChainDatabase>) -> Self {
        Self {
            config,
            db,
            signatures: Mutex::new(LruCache::new(
                NonZeroUsize::new(INMEMORY_SIGNATURES).unwrap_or(NonZeroUsize::MIN),
            )),
            proposals: RwLock::new(HashMap::new()),
            signer: RwLock::new(None),
        }
    }

    /// Get the configuration.
    pub fn config(&self) -> &CliqueConfig {
        &self.config
    }

    /// Injects the local signer used to seal new blocks.
    pub fn authorize(&self, signer: Address, sign_fn: SignFn) {
        *self.signer.write() = Some(Signer { address: signer, sign_fn });
        info!(target: "consensus::clique", %signer, "Clique signer authorized");
    }

    /// Get the current signer.
    pub fn signer(&self) -> Option<Address> {
        self.signer.read().as_ref().map(|signer| signer.address)
    }

    /// Propose to authorize or deauthorize an address.
    pub fn propose(&self, address: Address, authorize: bool) {
        self.proposals.write().insert(address, authorize);
    }

    /// Remove a proposal.
    pub fn discard(&self, address: Address) {
        self.proposals.write().remove(&address);
    }

    /// Proposals currently pushed by this node.
    pub fn proposals(&self) -> HashMap<Address, bool> {
        self.proposals.read().clone()
    }

    /// Extract the Ethereum address from a signed header.
    pub fn ecrecover(&self, header: &HeaderData) -> Result<Address, CliqueError> {
        let seal_hash = header.seal_hash();
        if let Some(address) = self.signatures.lock().get(&seal_hash) {
            return Ok(*address);
        }

        let signature = header.signature()?;
        let address = recover_address(seal_hash, signature)
            .map_err(|e| CliqueError::SignatureRecoveryFailed { message: e.to_string() })?;

        self.signatures.lock().put(seal_hash, address);
        Ok(address)
    }

    /// Signs `header` with the local signer, writing the seal into its extra-data.
    pub fn seal(&self, header: &mut HeaderData) -> Result<(), CliqueError> {
        if header.extra.len() < EXTRA_VANITY {
            return Err(CliqueError::MissingVanity);
        }
        if header.extra.len() < EXTRA_VANITY + EXTRA_SEAL {
            return Err(CliqueError::MissingSignature);
        }

        let (address, sign_fn) = match self.signer.read().as_ref() {
            Some(signer) => (signer.address, signer.sign_fn.clone()),
            None => return Err(CliqueError::NoSigner),
        };
        let signature = sign_fn(address, header.seal_hash())?;
        if signature.len() != EXTRA_SEAL {
            return Err(CliqueError::SignatureRecoveryFailed {
                message: format!("signer returned {} bytes", signature.len()),
            });
        }

        let mut extra = header.extra.to_vec();
        let start = extra.len() - EXTRA_SEAL;
        extra[start..].copy_from_slice(&signature);
        header.extra = extra.into();

        debug!(target: "consensus::clique", number = header.number, %address, "Sealed header");
        Ok(())
    }

    /// Records the signer list carried by checkpoint `header` under `hash`.
    pub fn checkpoint(&self, hash: B256, header: &HeaderData) -> Result<Vec<Address>, CliqueError> {
        let signers = header.checkpoint_signers()?;
        let raw: Vec<u8> = signers.iter().flat_map(|signer| signer.as_slice().iter().copied()).collect();
        self.db.put(&checkpoint_key(hash), &raw)?;
        debug!(target: "consensus::clique", %hash, signers = signers.len(), "Stored signer checkpoint");
        Ok(signers)
    }

    /// Signer list recorded at checkpoint `hash`.
    pub fn signers(&self, hash: B256) -> Result<Vec<Address>, CliqueError> {
        let raw = self.db.get(&checkpoint_key(hash))?.ok_or(CliqueError::CheckpointNotFound { hash })?;
        if raw.len() % 20 != 0 {
            return Err(CliqueError::InvalidCheckpointSigners);
        }
        Ok(raw.chunks(20).map(Address::from_slice).collect())
    }

    /// Recovers the sealer of `header` and checks it against checkpoint `hash`.
    pub fn verify_seal(&self, checkpoint: B256, header: &HeaderData) -> Result<Address, CliqueError> {
        let signer = self.ecrecover(header)?;
        if !self.signers(checkpoint)?.contains(&signer) {
            return Err(CliqueError::UnauthorizedSigner { signer });
        }
        Ok(signer)
    }

    /// RPC namespaces served by the engine.
    pub fn apis(self: &Arc<Self>) -> Vec<RpcApi> {
        vec![RpcApi::new("clique", "1.0", CliqueApi::new(self.clone()), false)]
    }
}

fn checkpoint_key(hash: B256) -> Vec<u8> {
    [CLIQUE_CHECKPOINT_PREFIX, hash.as_slice()].concat()
}
