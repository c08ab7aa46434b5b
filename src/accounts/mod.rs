//! Account management.
//!
//! Wallets hold signing keys; the [`AccountManager`] enumerates them. The node
//! only needs two things from this layer: the first local account (to default
//! the beneficiary) and a hash-signing function for the clique signer.

mod keystore;

pub use keystore::{public_key_address, recover_address, KeyStore, WalletManager};

use alloy_primitives::{Address, Bytes, B256};
use std::sync::Arc;

/// Errors returned by wallets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccountError {
    /// No wallet holds the account.
    #[error("unknown account {0}")]
    UnknownAccount(Address),

    /// The key material is unusable.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// A signature could not be produced or parsed.
    #[error("signature error: {0}")]
    Signature(String),
}

/// Signs a 32-byte hash on behalf of an account. Returns `[r | s | v]`.
pub type SignFn = Arc<dyn Fn(Address, B256) -> Result<Bytes, AccountError> + Send + Sync>;

/// A collection of accounts sharing one backend.
pub trait Wallet: Send + Sync {
    /// Locator of the wallet, e.g. `keystore://memory`.
    fn url(&self) -> String;

    /// Accounts held by the wallet, in a stable order.
    fn accounts(&self) -> Vec<Address>;

    /// Whether the wallet holds `account`.
    fn contains(&self, account: &Address) -> bool {
        self.accounts().contains(account)
    }

    /// Signs `hash` with the key of `account`.
    fn sign_hash(&self, account: Address, hash: B256) -> Result<Bytes, AccountError>;
}

/// Enumerates the wallets known to the node.
pub trait AccountManager: Send + Sync {
    /// All wallets, in a stable order.
    fn wallets(&self) -> Vec<Arc<dyn Wallet>>;

    /// Finds the wallet holding `account`.
    fn find(&self, account: &Address) -> Result<Arc<dyn Wallet>, AccountError> {
        self.wallets()
            .into_iter()
            .find(|wallet| wallet.contains(account))
            .ok_or(AccountError::UnknownAccount(*account))
    }

    /// First account of the first wallet that has one.
    fn first_account(&self) -> Option<Address> {
        self.wallets().iter().find_map(|wallet| wallet.accounts().first().copied())
    }
}

/// Binds a wallet's [`Wallet::sign_hash`] into a [`SignFn`].
pub fn sign_fn(wallet: Arc<dyn Wallet>) -> SignFn {
    Arc::new(move |account, hash| wallet.sign_hash(account, hash))
}
