//! # InventoryDb — sled-backed Record Store
//!
//! Persistent storage for node inventories, built on sled's embedded
//! key-value store.
//!
//! ## Tree Layout
//!
//! Each node gets its own named tree so that one node's keyspace can never
//! bleed into another's:
//!
//! | Tree                 | Key                | Value            |
//! |----------------------|--------------------|------------------|
//! | `inventory/<code>`   | item id (UTF-8)    | `bincode(Record)`|
//!
//! `list` returns records in item-id order, which is sled's lexicographic
//! key order.

use std::path::Path;

use sled::{Batch, Db, Tree};
use tracing::debug;

use super::{check_record, RecordLookup, RecordStore, StoreError, StoreResult};
use crate::inventory::record::Record;

const TREE_PREFIX: &str = "inventory/";

/// Persistent per-node inventory store.
///
/// sled trees support concurrent reads and serialized writes, so
/// `InventoryDb` can be shared across threads via `Arc<InventoryDb>`.
#[derive(Debug, Clone)]
pub struct InventoryDb {
    db: Db,
}

impl InventoryDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let db = sled::open(path)?;
        Ok(Self { db })
    }

    /// A database that lives only as long as this handle. Used in tests.
    pub fn open_temporary() -> StoreResult<Self> {
        let db = sled::Config::new().temporary(true).open()?;
        Ok(Self { db })
    }

    fn tree(&self, member: &str) -> StoreResult<Tree> {
        Ok(self.db.open_tree(format!("{TREE_PREFIX}{member}"))?)
    }

    fn decode(member: &str, bytes: &[u8]) -> StoreResult<Record> {
        let record: Record =
            bincode::deserialize(bytes).map_err(|e| StoreError::Serialization(e.to_string()))?;
        check_record(member, &record)?;
        Ok(record)
    }

    fn encode(record: &Record) -> StoreResult<Vec<u8>> {
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Flush all pending writes to disk.
    pub fn flush(&self) -> StoreResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

impl RecordLookup for InventoryDb {
    fn get(&self, member: &str, item_id: &str) -> StoreResult<Option<Record>> {
        match self.tree(member)?.get(item_id.as_bytes())? {
            Some(bytes) => Ok(Some(Self::decode(member, &bytes)?)),
            None => Ok(None),
        }
    }
}

impl RecordStore for InventoryDb {
    fn put(&self, member: &str, record: &Record) -> StoreResult<()> {
        check_record(member, record)?;
        let tree = self.tree(member)?;

        // Amend in place, keeping the holder's location.
        let stored = match tree.get(record.id.as_bytes())? {
            Some(bytes) => {
                let mut existing = Self::decode(member, &bytes)?;
                existing.qty = record.qty;
                existing.price = record.price;
                existing
            }
            None => record.clone(),
        };

        tree.insert(stored.id.as_bytes(), Self::encode(&stored)?)?;
        tree.flush()?;
        debug!(member, item_id = %stored.id, "record persisted");
        Ok(())
    }

    fn list(&self, member: &str) -> StoreResult<Vec<Record>> {
        let mut records = Vec::new();
        for entry in self.tree(member)?.iter() {
            let (_key, value) = entry?;
            records.push(Self::decode(member, &value)?);
        }
        Ok(records)
    }

    fn replace_all(&self, member: &str, records: &[Record]) -> StoreResult<()> {
        let mut batch = Batch::default();
        for r in records {
            check_record(member, r)?;
            batch.insert(r.id.as_bytes(), Self::encode(r)?);
        }

        let tree = self.tree(member)?;
        tree.clear()?;
        tree.apply_batch(batch)?;
        tree.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::record::seed_records;

    #[test]
    fn open_temporary_database() {
        let db = InventoryDb::open_temporary().unwrap();
        assert!(db.list("A").unwrap().is_empty());
        assert!(db.get("A", "001").unwrap().is_none());
    }

    #[test]
    fn seeded_records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let db = InventoryDb::open(dir.path()).unwrap();
            db.replace_all("A", &seed_records()).unwrap();
            db.flush().unwrap();
        }
        let db = InventoryDb::open(dir.path()).unwrap();
        assert_eq!(db.list("A").unwrap(), seed_records());
        assert!(db.list("B").unwrap().is_empty());
    }

    #[test]
    fn put_amends_and_keeps_location() {
        let db = InventoryDb::open_temporary().unwrap();
        db.replace_all("B", &seed_records()).unwrap();
        db.put("B", &Record::new("003", 5, 99, "A")).unwrap();
        assert_eq!(
            db.get("B", "003").unwrap().unwrap(),
            Record::new("003", 5, 99, "B")
        );

        db.put("B", &Record::new("005", 300, 22, "C")).unwrap();
        assert_eq!(db.list("B").unwrap().len(), 5);
    }

    #[test]
    fn members_are_isolated() {
        let db = InventoryDb::open_temporary().unwrap();
        db.put("A", &Record::new("001", 1, 1, "D")).unwrap();
        assert!(db.get("B", "001").unwrap().is_none());
    }

    #[test]
    fn replace_all_drops_previous_entries() {
        let db = InventoryDb::open_temporary().unwrap();
        db.replace_all("C", &seed_records()).unwrap();
        db.replace_all("C", &[Record::new("009", 1, 1, "C")]).unwrap();
        assert_eq!(db.list("C").unwrap().len(), 1);
    }
}
