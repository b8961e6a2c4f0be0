//! In-memory record store. Used by tests and by callers that persist
//! elsewhere.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::{check_record, RecordLookup, RecordStore, StoreResult};
use crate::inventory::record::{upsert, Record};

#[derive(Debug, Default)]
pub struct MemoryStore {
    nodes: RwLock<HashMap<String, Vec<Record>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store where every listed member holds a copy of `records`.
    pub fn replicated(members: &[&str], records: &[Record]) -> StoreResult<Self> {
        let store = Self::new();
        for member in members {
            store.replace_all(member, records)?;
        }
        Ok(store)
    }
}

impl RecordLookup for MemoryStore {
    fn get(&self, member: &str, item_id: &str) -> StoreResult<Option<Record>> {
        let nodes = self.nodes.read();
        Ok(nodes
            .get(member)
            .and_then(|records| records.iter().find(|r| r.id == item_id))
            .cloned())
    }
}

impl RecordStore for MemoryStore {
    fn put(&self, member: &str, record: &Record) -> StoreResult<()> {
        check_record(member, record)?;
        let mut nodes = self.nodes.write();
        upsert(nodes.entry(member.to_string()).or_default(), record);
        Ok(())
    }

    fn list(&self, member: &str) -> StoreResult<Vec<Record>> {
        Ok(self.nodes.read().get(member).cloned().unwrap_or_default())
    }

    fn replace_all(&self, member: &str, records: &[Record]) -> StoreResult<()> {
        for r in records {
            check_record(member, r)?;
        }
        self.nodes
            .write()
            .insert(member.to_string(), records.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::record::seed_records;
    use crate::storage::StoreError;

    #[test]
    fn test_get_put_list() {
        let store = MemoryStore::replicated(&["A", "B"], &seed_records()).unwrap();
        assert_eq!(store.get("A", "001").unwrap().unwrap().qty, 32);
        assert!(store.get("A", "999").unwrap().is_none());
        assert!(store.get("Z", "001").unwrap().is_none());

        store.put("B", &Record::new("005", 1, 2, "B")).unwrap();
        assert_eq!(store.list("B").unwrap().len(), 5);
        assert_eq!(store.list("A").unwrap().len(), 4);
    }

    #[test]
    fn test_invalid_record_refused() {
        let store = MemoryStore::new();
        let err = store.put("A", &Record::new("", 1, 1, "A")).unwrap_err();
        assert!(matches!(err, StoreError::InvalidRecord { .. }));
        assert!(store.list("A").unwrap().is_empty());
    }
}
