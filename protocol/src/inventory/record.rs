//! # Inventory Records
//!
//! The business fact every node attests to: an item id, a quantity, a unit
//! price, and the location code of the holding node.
//!
//! Records serialize with the field names the inventory files have always
//! used (`ID`, `QTY`, `Price`, `Location`), so existing JSON stores load
//! unchanged.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a record is refused at the store boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("record id must not be empty")]
    EmptyId,

    #[error("record location must not be empty")]
    EmptyLocation,

    /// Commas would make the `id,qty,price` commit message ambiguous.
    #[error("record id {0:?} must not contain ','")]
    SeparatorInId(String),
}

/// A single inventory line item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(rename = "QTY")]
    pub qty: u64,
    #[serde(rename = "Price")]
    pub price: u64,
    #[serde(rename = "Location")]
    pub location: String,
}

impl Record {
    pub fn new(id: impl Into<String>, qty: u64, price: u64, location: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            qty,
            price,
            location: location.into(),
        }
    }

    /// Shape checks applied whenever a record crosses the store boundary.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.id.trim().is_empty() {
            return Err(RecordError::EmptyId);
        }
        if self.id.contains(',') {
            return Err(RecordError::SeparatorInId(self.id.clone()));
        }
        if self.location.trim().is_empty() {
            return Err(RecordError::EmptyLocation);
        }
        Ok(())
    }

    /// Text signed by a proposer for the record-commit flow: `"{id},{qty},{price}"`.
    pub fn commit_message(&self) -> String {
        format!("{},{},{}", self.id, self.qty, self.price)
    }

    /// Text each node attests to in the query flow:
    /// `"Item: {id}, QTY: {qty}, Location: {location}"`.
    pub fn attestation_message(&self) -> String {
        format!(
            "Item: {}, QTY: {}, Location: {}",
            self.id, self.qty, self.location
        )
    }
}

/// Applies a committed record to one node's record list.
///
/// On id match the quantity and price are amended and the holder's location
/// is kept. Otherwise the record is appended as proposed.
///
/// Returns `true` when an existing entry was amended.
pub fn upsert(records: &mut Vec<Record>, record: &Record) -> bool {
    if let Some(existing) = records.iter_mut().find(|r| r.id == record.id) {
        existing.qty = record.qty;
        existing.price = record.price;
        true
    } else {
        records.push(record.clone());
        false
    }
}

/// The inventory every node starts with.
pub fn seed_records() -> Vec<Record> {
    vec![
        Record::new("001", 32, 12, "D"),
        Record::new("002", 20, 14, "C"),
        Record::new("003", 22, 16, "B"),
        Record::new("004", 12, 18, "A"),
    ]
}
