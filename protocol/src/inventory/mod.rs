//! # Inventory Module
//!
//! The record type every node holds and the consistency gate that must pass
//! before a multi-party attestation over a record is allowed to start.

pub mod consistency;
pub mod record;

pub use consistency::{
    check_consistency, compare_records, ConsistencyError, ConsistentView, Field, FieldMismatch,
};
pub use record::{seed_records, upsert, Record, RecordError};
