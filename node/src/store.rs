//! The node's inventory store, chosen at startup by `--backend`.

use std::path::Path;

use stockproof_protocol::inventory::record::Record;
use stockproof_protocol::storage::{
    InventoryDb, JsonStore, RecordLookup, RecordStore, StoreResult,
};

use crate::cli::Backend;

pub enum NodeStore {
    Json(JsonStore),
    Sled(InventoryDb),
}

impl NodeStore {
    /// Opens the store for `backend` under `data_dir`.
    pub fn open(backend: Backend, data_dir: &Path) -> StoreResult<Self> {
        Ok(match backend {
            Backend::Json => Self::Json(JsonStore::open(data_dir.join("inventory"))?),
            Backend::Sled => Self::Sled(InventoryDb::open(data_dir.join("db"))?),
        })
    }

    pub fn flush(&self) -> StoreResult<()> {
        match self {
            Self::Json(_) => Ok(()),
            Self::Sled(db) => db.flush(),
        }
    }
}

impl RecordLookup for NodeStore {
    fn get(&self, member: &str, item_id: &str) -> StoreResult<Option<Record>> {
        match self {
            Self::Json(s) => s.get(member, item_id),
            Self::Sled(s) => s.get(member, item_id),
        }
    }
}

impl RecordStore for NodeStore {
    fn put(&self, member: &str, record: &Record) -> StoreResult<()> {
        match self {
            Self::Json(s) => s.put(member, record),
            Self::Sled(s) => s.put(member, record),
        }
    }

    fn list(&self, member: &str) -> StoreResult<Vec<Record>> {
        match self {
            Self::Json(s) => s.list(member),
            Self::Sled(s) => s.list(member),
        }
    }

    fn replace_all(&self, member: &str, records: &[Record]) -> StoreResult<()> {
        match self {
            Self::Json(s) => s.replace_all(member, records),
            Self::Sled(s) => s.replace_all(member, records),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockproof_protocol::inventory::record::seed_records;

    #[test]
    fn both_backends_roundtrip() {
        for backend in [Backend::Json, Backend::Sled] {
            let dir = tempfile::tempdir().unwrap();
            let store = NodeStore::open(backend, dir.path()).unwrap();
            store.replace_all("A", &seed_records()).unwrap();
            store.put("A", &Record::new("001", 1, 2, "B")).unwrap();
            store.flush().unwrap();
            assert_eq!(
                store.get("A", "001").unwrap(),
                Some(Record::new("001", 1, 2, "D"))
            );
        }
    }
}
