//! Typed records stored in the chain database.
//!
//! ```text
//! "h" ++ number(8 BE) ++ "n"   -> canonical hash
//! "LastBlock"                  -> head block hash
//! "LastNumber"                 -> head block number (8 BE)
//! "BlockchainVersion"          -> schema version (8 BE)
//! "ethereum-config-" ++ hash   -> fork schedule (JSON)
//! ```

use super::traits::{ChainDatabase, StorageError};
use crate::chainspec::ForkSchedule;
use alloy_primitives::B256;

/// Schema version written by this node.
pub const BLOCKCHAIN_VERSION: u64 = 3;

const HEADER_PREFIX: &[u8] = b"h";
const CANONICAL_SUFFIX: &[u8] = b"n";
const HEAD_BLOCK_KEY: &[u8] = b"LastBlock";
const HEAD_NUMBER_KEY: &[u8] = b"LastNumber";
const VERSION_KEY: &[u8] = b"BlockchainVersion";
const CONFIG_PREFIX: &[u8] = b"ethereum-config-";

fn canonical_key(number: u64) -> Vec<u8> {
    [HEADER_PREFIX, &number.to_be_bytes()[..], CANONICAL_SUFFIX].concat()
}

fn config_key(genesis: B256) -> Vec<u8> {
    [CONFIG_PREFIX, genesis.as_slice()].concat()
}

fn decode_u64(key: &str, raw: &[u8]) -> Result<u64, StorageError> {
    let bytes: [u8; 8] = raw.try_into().map_err(|_| StorageError::Corrupted {
        key: key.to_string(),
        reason: format!("expected 8 bytes, got {}", raw.len()),
    })?;
    Ok(u64::from_be_bytes(bytes))
}

fn decode_hash(key: &str, raw: &[u8]) -> Result<B256, StorageError> {
    if raw.len() != 32 {
        return Err(StorageError::Corrupted {
            key: key.to_string(),
            reason: format!("expected 32 bytes, got {}", raw.len()),
        });
    }
    Ok(B256::from_slice(raw))
}

/// Reads the canonical hash at `number`.
pub fn read_canonical_hash(db: &dyn ChainDatabase, number: u64) -> Result<Option<B256>, StorageError> {
    db.get(&canonical_key(number))?
        .map(|raw| decode_hash("canonical hash", &raw))
        .transpose()
}

/// Writes the canonical hash at `number`.
pub fn write_canonical_hash(db: &dyn ChainDatabase, number: u64, hash: B256) -> Result<(), StorageError> {
    db.put(&canonical_key(number), hash.as_slice())
}

/// Removes the canonical hash at `number`.
pub fn delete_canonical_hash(db: &dyn ChainDatabase, number: u64) -> Result<(), StorageError> {
    db.delete(&canonical_key(number))
}

/// Reads the head block number.
pub fn read_head_number(db: &dyn ChainDatabase) -> Result<Option<u64>, StorageError> {
    db.get(HEAD_NUMBER_KEY)?.map(|raw| decode_u64("head number", &raw)).transpose()
}

/// Reads the head block hash.
pub fn read_head_hash(db: &dyn ChainDatabase) -> Result<Option<B256>, StorageError> {
    db.get(HEAD_BLOCK_KEY)?.map(|raw| decode_hash("head hash", &raw)).transpose()
}

/// Writes the head block number and hash.
pub fn write_head_block(db: &dyn ChainDatabase, number: u64, hash: B256) -> Result<(), StorageError> {
    db.put(HEAD_BLOCK_KEY, hash.as_slice())?;
    db.put(HEAD_NUMBER_KEY, &number.to_be_bytes())
}

/// Reads the schema version, `0` when never written.
pub fn read_blockchain_version(db: &dyn ChainDatabase) -> Result<u64, StorageError> {
    db.get(VERSION_KEY)?
        .map(|raw| decode_u64("blockchain version", &raw))
        .transpose()
        .map(Option::unwrap_or_default)
}

/// Writes the schema version.
pub fn write_blockchain_version(db: &dyn ChainDatabase, version: u64) -> Result<(), StorageError> {
    db.put(VERSION_KEY, &version.to_be_bytes())
}

/// Reads the fork schedule stored for the chain with genesis `genesis`.
pub fn read_chain_config(
    db: &dyn ChainDatabase,
    genesis: B256,
) -> Result<Option<ForkSchedule>, StorageError> {
    db.get(&config_key(genesis))?
        .map(|raw| {
            serde_json::from_slice(&raw).map_err(|e| StorageError::Corrupted {
                key: format!("chain config {genesis}"),
                reason: e.to_string(),
            })
        })
        .transpose()
}

/// Persists the fork schedule for the chain with genesis `genesis`.
pub fn write_chain_config(
    db: &dyn ChainDatabase,
    genesis: B256,
    config: &ForkSchedule,
) -> Result<(), StorageError> {
    let raw = serde_json::to_vec(config).map_err(|e| StorageError::Encoding(e.to_string()))?;
    db.put(&config_key(genesis), &raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{chainspec::MAINNET, storage::MemoryDatabase};

    #[test]
    fn test_canonical_and_head_records() {
        let db = MemoryDatabase::new();
        assert_eq!(read_canonical_hash(&db, 0).unwrap(), None);
        assert_eq!(read_head_number(&db).unwrap(), None);

        let hash = B256::repeat_byte(0xaa);
        write_canonical_hash(&db, 0, hash).unwrap();
        write_head_block(&db, 12, hash).unwrap();

        assert_eq!(read_canonical_hash(&db, 0).unwrap(), Some(hash));
        assert_eq!(read_canonical_hash(&db, 1).unwrap(), None);
        assert_eq!(read_head_number(&db).unwrap(), Some(12));
        assert_eq!(read_head_hash(&db).unwrap(), Some(hash));
    }

    #[test]
    fn test_version_defaults_to_zero() {
        let db = MemoryDatabase::new();
        assert_eq!(read_blockchain_version(&db).unwrap(), 0);
        write_blockchain_version(&db, BLOCKCHAIN_VERSION).unwrap();
        assert_eq!(read_blockchain_version(&db).unwrap(), BLOCKCHAIN_VERSION);
    }

    #[test]
    fn test_chain_config_round_trip() {
        let db = MemoryDatabase::new();
        let genesis = B256::repeat_byte(0x01);
        write_chain_config(&db, genesis, &MAINNET).unwrap();
        assert_eq!(read_chain_config(&db, genesis).unwrap().as_ref(), Some(&*MAINNET));
        assert_eq!(read_chain_config(&db, B256::ZERO).unwrap(), None);
    }

    #[test]
    fn test_corrupted_number() {
        let db = MemoryDatabase::new();
        db.put(HEAD_NUMBER_KEY, &[1, 2, 3]).unwrap();
        assert!(matches!(read_head_number(&db), Err(StorageError::Corrupted { .. })));
    }
}
