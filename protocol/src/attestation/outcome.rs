//! Results handed back to the caller by the two attestation flows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::consensus::{RoundDecision, Vote};
use crate::crypto::encryption::Ciphertext;
use crate::crypto::signatures::RsaSignature;
use crate::inventory::record::Record;
use crate::multisig::{AggregateSignature, PartialSignature, Statement};
use crate::storage::{RecordStore, StoreResult};

/// "Write `record` to `member`'s store." Issued once per roster member on
/// commit; the core itself never writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistInstruction {
    pub member: String,
    pub record: Record,
}

impl PersistInstruction {
    /// Applies the instruction with upsert semantics.
    pub fn apply(&self, store: &dyn RecordStore) -> StoreResult<()> {
        store.put(&self.member, &self.record)?;
        debug!(member = %self.member, item_id = %self.record.id, "persist instruction applied");
        Ok(())
    }
}

/// Result of `propose_and_commit`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsensusOutcome {
    pub round_id: Uuid,
    pub proposer: String,
    pub record: Record,
    pub signature: RsaSignature,
    pub committed: bool,
    /// Accepting votes, proposer included.
    pub vote_count: usize,
    pub quorum: usize,
    /// Every member's vote, proposer first.
    pub votes: Vec<Vote>,
    /// One per roster member when committed, empty otherwise.
    pub persist: Vec<PersistInstruction>,
    pub decided_at: DateTime<Utc>,
}

impl ConsensusOutcome {
    pub(crate) fn from_decision(
        decision: RoundDecision,
        proposer: String,
        record: Record,
        signature: RsaSignature,
        members: &[&str],
    ) -> Self {
        let committed = decision.committed();
        let persist = if committed {
            members
                .iter()
                .map(|m| PersistInstruction {
                    member: (*m).to_string(),
                    record: record.clone(),
                })
                .collect()
        } else {
            Vec::new()
        };

        Self {
            round_id: decision.round_id,
            proposer,
            record,
            signature,
            committed,
            vote_count: decision.accepts,
            quorum: decision.quorum,
            votes: decision.votes,
            persist,
            decided_at: Utc::now(),
        }
    }

    /// Applies every persistence instruction in roster order. Stops at the
    /// first store error.
    pub fn apply(&self, store: &dyn RecordStore) -> StoreResult<usize> {
        for instruction in &self.persist {
            instruction.apply(store)?;
        }
        Ok(self.persist.len())
    }
}

/// Result of `query_and_attest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationOutcome {
    pub session_id: Uuid,
    pub item_id: String,
    /// The reference member's attested message, as encrypted.
    pub message: String,
    pub statements: Vec<Statement>,
    pub partials: Vec<PartialSignature>,
    pub aggregate_signature: AggregateSignature,
    pub verified: bool,
    pub ciphertext: Ciphertext,
    /// Present only when the orchestrator holds the private key matching the
    /// requestor key the message was encrypted under.
    pub recovered_plaintext: Option<String>,
    pub attested_at: DateTime<Utc>,
}
