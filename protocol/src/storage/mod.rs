//! # Storage Module
//!
//! Per-node inventory persistence. The attestation core never writes to a
//! store: it reads through [`RecordLookup`] during consistency checks and
//! hands back persistence instructions, which the caller applies through
//! [`RecordStore::put`].
//!
//! ## Architecture
//!
//! ```text
//! memory.rs — in-process store, parking_lot::RwLock over a HashMap
//! json.rs   — one pretty-printed `inventory_<code>.json` file per node
//! db.rs     — sled, one tree per node, bincode values
//! ```
//!
//! All three are keyed by `(member code, item id)` and validate records on
//! the way in and on the way out.

pub mod db;
pub mod json;
pub mod memory;

use std::path::PathBuf;

use thiserror::Error;

use crate::inventory::record::{Record, RecordError};

pub use db::InventoryDb;
pub use json::JsonStore;
pub use memory::MemoryStore;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid record at {member}: {source}")]
    InvalidRecord {
        member: String,
        #[source]
        source: RecordError,
    },
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to every node's records.
pub trait RecordLookup: Send + Sync {
    /// Looks up `item_id` at `member`. `Ok(None)` means not held there.
    fn get(&self, member: &str, item_id: &str) -> StoreResult<Option<Record>>;
}

/// Full read/write access.
pub trait RecordStore: RecordLookup {
    /// Applies `record` at `member` with upsert semantics
    /// (see [`upsert`](crate::inventory::record::upsert)).
    fn put(&self, member: &str, record: &Record) -> StoreResult<()>;

    /// Every record held at `member`, in storage order.
    fn list(&self, member: &str) -> StoreResult<Vec<Record>>;

    /// Replaces `member`'s records wholesale.
    fn replace_all(&self, member: &str, records: &[Record]) -> StoreResult<()>;
}

pub(crate) fn check_record(member: &str, record: &Record) -> StoreResult<()> {
    record.validate().map_err(|source| StoreError::InvalidRecord {
        member: member.to_string(),
        source,
    })
}
