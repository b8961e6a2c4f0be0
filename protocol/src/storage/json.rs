//! # JSON File Store
//!
//! One pretty-printed JSON array per node, in the layout the inventory
//! files have always had:
//!
//! ```text
//! <dir>/inventory_a.json
//! <dir>/inventory_b.json
//! ...
//! ```
//!
//! A missing file reads as an empty inventory. Writes go to a temporary file
//! in the same directory and are renamed into place, so a crash mid-write
//! never leaves a truncated inventory behind.

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::debug;

use super::{check_record, RecordLookup, RecordStore, StoreError, StoreResult};
use crate::inventory::record::{upsert, Record};

#[derive(Debug)]
pub struct JsonStore {
    dir: PathBuf,
    // Serializes read-modify-write cycles in `put`.
    write_lock: Mutex<()>,
}

impl JsonStore {
    /// Opens (and creates, if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    /// `inventory_<code>.json`, lower-cased.
    pub fn file_for(&self, member: &str) -> PathBuf {
        self.dir
            .join(format!("inventory_{}.json", member.to_lowercase()))
    }

    fn load(&self, member: &str) -> StoreResult<Vec<Record>> {
        let path = self.file_for(member);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }

        let records: Vec<Record> =
            serde_json::from_str(&text).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?;
        for r in &records {
            check_record(member, r)?;
        }
        Ok(records)
    }

    fn save(&self, member: &str, records: &[Record]) -> StoreResult<()> {
        let path = self.file_for(member);
        let body = serde_json::to_string_pretty(records).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(member, path = %path.display(), records = records.len(), "inventory file written");
        Ok(())
    }
}

impl RecordLookup for JsonStore {
    fn get(&self, member: &str, item_id: &str) -> StoreResult<Option<Record>> {
        Ok(self.load(member)?.into_iter().find(|r| r.id == item_id))
    }
}

impl RecordStore for JsonStore {
    fn put(&self, member: &str, record: &Record) -> StoreResult<()> {
        check_record(member, record)?;
        let _guard = self.write_lock.lock();
        let mut records = self.load(member)?;
        upsert(&mut records, record);
        self.save(member, &records)
    }

    fn list(&self, member: &str) -> StoreResult<Vec<Record>> {
        self.load(member)
    }

    fn replace_all(&self, member: &str, records: &[Record]) -> StoreResult<()> {
        for r in records {
            check_record(member, r)?;
        }
        let _guard = self.write_lock.lock();
        self.save(member, records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::record::seed_records;

    #[test]
    fn test_missing_file_is_empty_inventory() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        assert!(store.list("A").unwrap().is_empty());
        assert!(store.get("A", "001").unwrap().is_none());
    }

    #[test]
    fn test_roundtrip_and_file_layout() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        store.replace_all("A", &seed_records()).unwrap();

        let path = dir.path().join("inventory_a.json");
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"ID\": \"001\""));
        assert!(raw.contains("\"Location\": \"D\""));

        store.put("A", &Record::new("001", 40, 12, "A")).unwrap();
        let r = store.get("A", "001").unwrap().unwrap();
        assert_eq!(r.qty, 40);
        assert_eq!(r.location, "D");
    }

    #[test]
    fn test_reads_hand_written_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("inventory_b.json"),
            r#"[{"ID": "002", "QTY": 20, "Price": 14, "Location": "C"}]"#,
        )
        .unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        assert_eq!(store.get("B", "002").unwrap().unwrap().price, 14);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("inventory_c.json"), "{not json").unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.get("C", "001").unwrap_err(),
            StoreError::Json { .. }
        ));
    }

    #[test]
    fn test_invalid_record_in_file_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("inventory_d.json"),
            r#"[{"ID": "", "QTY": 1, "Price": 1, "Location": "D"}]"#,
        )
        .unwrap();
        let store = JsonStore::open(dir.path()).unwrap();
        assert!(matches!(
            store.list("D").unwrap_err(),
            StoreError::InvalidRecord { .. }
        ));
    }
}
