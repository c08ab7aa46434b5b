//! Clique consensus errors.

use crate::{accounts::AccountError, storage::StorageError};
use alloy_primitives::{Address, B256};
use thiserror::Error;

/// Clique consensus errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CliqueError {
    /// Missing vanity in extra-data.
    #[error("extra-data 32 byte vanity prefix missing")]
    MissingVanity,

    /// Missing signature in extra-data.
    #[error("extra-data 65 byte signature suffix missing")]
    MissingSignature,

    /// Invalid signer list on checkpoint block.
    #[error("invalid signer list on checkpoint block")]
    InvalidCheckpointSigners,

    /// Unauthorized signer.
    #[error("unauthorized signer: {signer}")]
    UnauthorizedSigner { signer: Address },

    /// No local signer was authorized.
    #[error("sealing requires an authorized signer")]
    NoSigner,

    /// Signature recovery failed.
    #[error("signature recovery failed: {message}")]
    SignatureRecoveryFailed { message: String },

    /// Checkpoint not found.
    #[error("no signer checkpoint for hash {hash}")]
    CheckpointNotFound { hash: B256 },

    /// The signing function failed.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Database error.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
