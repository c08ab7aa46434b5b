//! In-memory secp256k1 key store.

use super::{AccountError, AccountManager, Wallet};
use alloy_primitives::{keccak256, Address, Bytes, B256};
use parking_lot::RwLock;
use secp256k1::{
    ecdsa::{RecoverableSignature, RecoveryId},
    Message, PublicKey, SecretKey, SECP256K1,
};
use std::sync::Arc;

/// Derives the account address of a public key (last 20 bytes of its keccak hash).
pub fn public_key_address(public: &PublicKey) -> Address {
    let hash = keccak256(&public.serialize_uncompressed()[1..]);
    Address::from_slice(&hash[12..])
}

/// Recovers the signer of a 65-byte `[r | s | v]` signature over `hash`.
///
/// Accepts both `0/1` and `27/28` recovery ids.
pub fn recover_address(hash: B256, signature: &[u8]) -> Result<Address, AccountError> {
    if signature.len() != 65 {
        return Err(AccountError::Signature(format!(
            "expected 65 signature bytes, got {}",
            signature.len()
        )));
    }
    let v = signature[64];
    let recovery_id = RecoveryId::try_from(i32::from(if v >= 27 { v - 27 } else { v }))
        .map_err(|e| AccountError::Signature(e.to_string()))?;
    let signature = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|e| AccountError::Signature(e.to_string()))?;
    let public = SECP256K1
        .recover_ecdsa(&Message::from_digest(hash.0), &signature)
        .map_err(|e| AccountError::Signature(e.to_string()))?;
    Ok(public_key_address(&public))
}

/// Wallet keeping plain secret keys in memory.
#[derive(Debug, Default)]
pub struct KeyStore {
    url: String,
    keys: RwLock<Vec<(Address, SecretKey)>>,
}

impl KeyStore {
    /// Create an empty key store.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), keys: RwLock::new(Vec::new()) }
    }

    /// Imports a raw 32-byte secret key. Returns its address.
    pub fn import(&self, secret: B256) -> Result<Address, AccountError> {
        let secret =
            SecretKey::from_slice(secret.as_slice()).map_err(|e| AccountError::InvalidKey(e.to_string()))?;
        let address = public_key_address(&secret.public_key(SECP256K1));
        let mut keys = self.keys.write();
        if !keys.iter().any(|(existing, _)| *existing == address) {
            keys.push((address, secret));
        }
        Ok(address)
    }

    /// Imports the key derived from `seed` by hashing it. Development use only.
    pub fn import_insecure_seed(&self, seed: &str) -> Result<Address, AccountError> {
        self.import(keccak256(seed.as_bytes()))
    }

    fn secret(&self, account: &Address) -> Result<SecretKey, AccountError> {
        self.keys
            .read()
            .iter()
            .find(|(address, _)| address == account)
            .map(|(_, secret)| *secret)
            .ok_or(AccountError::UnknownAccount(*account))
    }
}

impl Wallet for KeyStore {
    fn url(&self) -> String {
        self.url.clone()
    }

    fn accounts(&self) -> Vec<Address> {
        self.keys.read().iter().map(|(address, _)| *address).collect()
    }

    fn sign_hash(&self, account: Address, hash: B256) -> Result<Bytes, AccountError> {
        let secret = self.secret(&account)?;
        let signature = SECP256K1.sign_ecdsa_recoverable(&Message::from_digest(hash.0), &secret);
        let (recovery_id, compact) = signature.serialize_compact();

        let mut out = [0u8; 65];
        out[..64].copy_from_slice(&compact);
        out[64] = i32::from(recovery_id) as u8;
        Ok(Bytes::copy_from_slice(&out))
    }
}

/// Fixed list of wallets.
#[derive(Default)]
pub struct WalletManager {
    wallets: RwLock<Vec<Arc<dyn Wallet>>>,
}

impl WalletManager {
    /// Create a manager with no wallets.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a wallet.
    pub fn add_wallet(&self, wallet: Arc<dyn Wallet>) {
        self.wallets.write().push(wallet);
    }
}

impl std::fmt::Debug for WalletManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let urls: Vec<_> = self.wallets.read().iter().map(|wallet| wallet.url()).collect();
        f.debug_struct("WalletManager").field("wallets", &urls).finish()
    }
}

impl AccountManager for WalletManager {
    fn wallets(&self) -> Vec<Arc<dyn Wallet>> {
        self.wallets.read().clone()
    }
}
