//! Miner error types.

use super::config::MAXIMUM_EXTRA_DATA_SIZE;
use crate::consensus::CliqueError;
use thiserror::Error;

/// Errors that can occur during mining operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MinerError {
    /// Extra-data does not fit into a header.
    #[error("extra exceeds max length. {len} > {MAXIMUM_EXTRA_DATA_SIZE}")]
    ExtraTooLong { len: usize },

    /// The worker task is gone.
    #[error("channel error: {0}")]
    ChannelError(String),

    /// Sealing with the clique signer failed.
    #[error("failed to seal block: {0}")]
    SealFailed(#[from] CliqueError),
}

/// Result type for miner operations.
pub type MinerResult<T> = Result<T, MinerError>;
