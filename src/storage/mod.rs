//! Chain database access.
//!
//! The storage engine itself is an external collaborator. The node talks to it
//! through [`ChainDatabase`], a flat key-value interface, and keeps the handful
//! of records it owns (canonical genesis hash, head, schema version, fork
//! schedule) in [`schema`].
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                    Chain Database                       │
//! ├─────────────────────────────────────────────────────────┤
//! │                                                         │
//! │  ┌─────────────────────┐  ┌─────────────────────────┐   │
//! │  │   schema            │  │   ChainDatabase         │   │
//! │  │   (typed records)   │─▶│   (get / put / close)   │   │
//! │  └─────────────────────┘  └────────────┬────────────┘   │
//! │                                        │                │
//! │                           ┌────────────┴────────────┐   │
//! │                           │  MemoryDatabase         │   │
//! │                           │  (or a disk backend)    │   │
//! │                           └─────────────────────────┘   │
//! └─────────────────────────────────────────────────────────┘
//! ```

mod memory;
pub mod schema;
mod traits;

pub use memory::{MemoryDatabase, MemoryDatabaseOpener};
pub use schema::BLOCKCHAIN_VERSION;
pub use traits::{ChainDatabase, DatabaseOpener, StorageError, UpgradeHandle};
