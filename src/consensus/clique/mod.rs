//! Clique proof-of-authority consensus engine.
//!
//! Blocks are sealed by a rotating set of authorized signers. The node's part
//! in it is small: it hands the engine a signer address plus a signing
//! function when mining starts, and exposes the `clique` namespace for signer
//! proposals. Checkpointed signer lists are kept in the chain database.

mod api;
mod engine;
mod error;

pub use api::CliqueApi;
pub use engine::{Clique, HeaderData};
pub use error::CliqueError;

/// Fixed number of extra-data prefix bytes reserved for signer vanity.
pub const EXTRA_VANITY: usize = 32;

/// Fixed number of extra-data suffix bytes reserved for signer seal (65 bytes signature).
pub const EXTRA_SEAL: usize = 65;

/// Number of recent block signatures to keep in memory.
pub const INMEMORY_SIGNATURES: usize = 4096;

/// Database key prefix for checkpointed signer lists.
pub const CLIQUE_CHECKPOINT_PREFIX: &[u8] = b"clique-";
