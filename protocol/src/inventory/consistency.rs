//! # Record Consistency Checker
//!
//! Looks up one item id at every roster member and compares the mutable
//! fields (quantity, price, location) against the reference member, which is
//! the first roster entry.
//!
//! ## Rules
//!
//! - Lookups happen in roster order. The first member that does not hold the
//!   item stops the check with [`ConsistencyError::RecordNotFound`]; the
//!   remaining members are never queried.
//! - If every member holds the item, *all* divergences are collected and
//!   reported together in [`ConsistencyError::RecordMismatch`].
//! - A mismatch is a hard stop for the query flow. Callers must not start a
//!   multisignature session on anything but `Ok(ConsistentView)`.

use std::fmt;

use thiserror::Error;
use tracing::{debug, warn};

use super::record::Record;
use crate::config::MEMBER_LABEL_PREFIX;
use crate::roster::Roster;
use crate::storage::{RecordLookup, StoreError};

/// A mutable record field that takes part in the comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Qty,
    Price,
    Location,
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Qty => write!(f, "QTY"),
            Field::Price => write!(f, "Price"),
            Field::Location => write!(f, "Location"),
        }
    }
}

/// One `(member, field, actual, expected)` divergence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub member: String,
    pub field: Field,
    pub actual: String,
    pub expected: String,
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}: {} is {}, expected {}",
            MEMBER_LABEL_PREFIX, self.member, self.field, self.actual, self.expected
        )
    }
}

/// The agreed view of a record: one copy per member, all equal to the
/// reference on every compared field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistentView {
    pub reference: String,
    pub record: Record,
    /// `(member code, record as held there)` in roster order.
    pub holdings: Vec<(String, Record)>,
}

#[derive(Debug, Error)]
pub enum ConsistencyError {
    #[error("item {item_id} not found at Inventory {member}")]
    RecordNotFound { member: String, item_id: String },

    #[error("item {item_id} differs from reference Inventory {reference}: {}", render(.mismatches))]
    RecordMismatch {
        item_id: String,
        reference: String,
        mismatches: Vec<FieldMismatch>,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

fn render(mismatches: &[FieldMismatch]) -> String {
    mismatches
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Field-by-field comparison of `actual` (held at `member`) against `expected`.
pub fn compare_records(member: &str, actual: &Record, expected: &Record) -> Vec<FieldMismatch> {
    let mut out = Vec::new();
    let mut push = |field, a: String, e: String| {
        if a != e {
            out.push(FieldMismatch {
                member: member.to_string(),
                field,
                actual: a,
                expected: e,
            });
        }
    };
    push(Field::Qty, actual.qty.to_string(), expected.qty.to_string());
    push(Field::Price, actual.price.to_string(), expected.price.to_string());
    push(
        Field::Location,
        actual.location.clone(),
        expected.location.clone(),
    );
    out
}

/// Checks that every roster member holds the same view of `item_id`.
pub fn check_consistency(
    roster: &Roster,
    item_id: &str,
    lookup: &dyn RecordLookup,
) -> Result<ConsistentView, ConsistencyError> {
    let mut holdings = Vec::with_capacity(roster.len());
    for member in roster.iter() {
        match lookup.get(member.code(), item_id)? {
            Some(record) => holdings.push((member.code().to_string(), record)),
            None => {
                warn!(member = member.code(), item_id, "record missing at member");
                return Err(ConsistencyError::RecordNotFound {
                    member: member.code().to_string(),
                    item_id: item_id.to_string(),
                });
            }
        }
    }

    let reference = roster.reference().code().to_string();
    let expected = holdings[0].1.clone();

    let mismatches: Vec<FieldMismatch> = holdings
        .iter()
        .skip(1)
        .flat_map(|(member, record)| compare_records(member, record, &expected))
        .collect();

    if !mismatches.is_empty() {
        warn!(
            item_id,
            reference = %reference,
            mismatches = mismatches.len(),
            "inconsistent record across roster"
        );
        return Err(ConsistencyError::RecordMismatch {
            item_id: item_id.to_string(),
            reference,
            mismatches,
        });
    }

    debug!(item_id, members = holdings.len(), "record consistent across roster");
    Ok(ConsistentView {
        reference,
        record: expected,
        holdings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AttestationConfig;
    use crate::inventory::record::seed_records;
    use crate::storage::{MemoryStore, RecordStore, StoreResult};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn demo_roster() -> Roster {
        Roster::from_config(&AttestationConfig::demo()).unwrap()
    }

    fn replicated() -> MemoryStore {
        MemoryStore::replicated(&["A", "B", "C", "D"], &seed_records()).unwrap()
    }

    struct CountingLookup<'a> {
        inner: &'a MemoryStore,
        calls: AtomicUsize,
    }

    impl RecordLookup for CountingLookup<'_> {
        fn get(&self, member: &str, item_id: &str) -> StoreResult<Option<Record>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get(member, item_id)
        }
    }

    #[test]
    fn test_consistent_record() {
        let view = check_consistency(&demo_roster(), "001", &replicated()).unwrap();
        assert_eq!(view.reference, "A");
        assert_eq!(view.record, Record::new("001", 32, 12, "D"));
        assert_eq!(view.holdings.len(), 4);
    }

    #[test]
    fn test_price_mismatch_names_member_and_field() {
        let store = replicated();
        store.put("C", &Record::new("001", 32, 13, "D")).unwrap();

        let err = check_consistency(&demo_roster(), "001", &store).unwrap_err();
        match err {
            ConsistencyError::RecordMismatch {
                reference,
                mismatches,
                ..
            } => {
                assert_eq!(reference, "A");
                assert_eq!(
                    mismatches,
                    vec![FieldMismatch {
                        member: "C".into(),
                        field: Field::Price,
                        actual: "13".into(),
                        expected: "12".into(),
                    }]
                );
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_every_divergence_reported() {
        let store = replicated();
        store.put("B", &Record::new("002", 21, 14, "C")).unwrap();
        let mut d = seed_records();
        d[1].location = "Z".into();
        d[1].price = 1;
        store.replace_all("D", &d).unwrap();

        let err = check_consistency(&demo_roster(), "002", &store).unwrap_err();
        let ConsistencyError::RecordMismatch { mismatches, .. } = err else {
            panic!("expected mismatch");
        };
        let fields: Vec<(&str, Field)> = mismatches
            .iter()
            .map(|m| (m.member.as_str(), m.field))
            .collect();
        assert_eq!(
            fields,
            vec![("B", Field::Qty), ("D", Field::Price), ("D", Field::Location)]
        );
    }

    #[test]
    fn test_missing_record_short_circuits() {
        let store = replicated();
        store
            .replace_all("B", &seed_records()[1..])
            .unwrap();
        // C disagrees too, but must never be looked at.
        store.put("C", &Record::new("001", 0, 0, "D")).unwrap();

        let lookup = CountingLookup {
            inner: &store,
            calls: AtomicUsize::new(0),
        };
        let err = check_consistency(&demo_roster(), "001", &lookup).unwrap_err();
        match err {
            ConsistencyError::RecordNotFound { member, item_id } => {
                assert_eq!(member, "B");
                assert_eq!(item_id, "001");
            }
            other => panic!("unexpected: {other}"),
        }
        assert_eq!(lookup.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_mismatch_display() {
        let m = FieldMismatch {
            member: "B".into(),
            field: Field::Qty,
            actual: "1".into(),
            expected: "2".into(),
        };
        assert_eq!(m.to_string(), "Inventory B: QTY is 1, expected 2");
    }
}
