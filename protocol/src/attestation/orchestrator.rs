//! # Attestation Orchestrator
//!
//! The single entry point a caller (CLI, HTTP layer, test) uses. It owns the
//! injected configuration, the derived roster keys, and the PKG and
//! requestor key pairs, and composes the lower layers into two flows:
//!
//! ```text
//! propose_and_commit:  sign (MD5-64) ──► PoA round ──► persist instructions
//!
//! query_and_attest:    consistency ──► Harn session (SHA-256, PKG n)
//!                          │                 │
//!                          └─ stop on        └─► encrypt for requestor
//!                             mismatch /         ──► decrypt (own key only)
//!                             not found
//! ```

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use super::error::AttestationError;
use super::outcome::{AttestationOutcome, ConsensusOutcome};
use crate::config::{AttestationConfig, COMMIT_HASH_DOMAIN, QUERY_HASH_DOMAIN};
use crate::consensus::{run_round, run_round_async, HonestValidator, Proposal, Validator};
use crate::crypto::encryption::{decrypt, encrypt};
use crate::crypto::keys::{generate_keypair, RsaKeypair, RsaPublicKey};
use crate::crypto::signatures::sign;
use crate::inventory::consistency::check_consistency;
use crate::inventory::record::Record;
use crate::multisig::MultisigSession;
use crate::roster::Roster;
use crate::storage::RecordLookup;

pub struct Orchestrator {
    config: AttestationConfig,
    roster: Roster,
    pkg: RsaKeypair,
    requestor: RsaKeypair,
    validator: Arc<dyn Validator>,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("members", &self.roster.codes())
            .field("quorum", &self.roster.quorum())
            .finish_non_exhaustive()
    }
}

impl Orchestrator {
    /// Validates `config` and derives every key pair it names.
    pub fn new(config: AttestationConfig) -> Result<Self, AttestationError> {
        let roster = Roster::from_config(&config)?;
        let pkg = generate_keypair(&config.pkg)
            .map_err(|source| AttestationError::Key { party: "PKG", source })?;
        let requestor = generate_keypair(&config.requestor).map_err(|source| {
            AttestationError::Key {
                party: "requestor",
                source,
            }
        })?;

        info!(
            members = roster.len(),
            quorum = roster.quorum(),
            pkg_bits = pkg.modulus().bits(),
            "orchestrator ready"
        );

        Ok(Self {
            config,
            roster,
            pkg,
            requestor,
            validator: Arc::new(HonestValidator),
        })
    }

    /// Replaces the reviewer every non-proposer member runs.
    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn config(&self) -> &AttestationConfig {
        &self.config
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn pkg_keypair(&self) -> &RsaKeypair {
        &self.pkg
    }

    pub fn requestor_keypair(&self) -> &RsaKeypair {
        &self.requestor
    }

    pub fn requestor_public(&self) -> &RsaPublicKey {
        self.requestor.public_key()
    }

    // -- Record-commit flow -------------------------------------------------

    /// Signs `record` as `proposer` (code or label).
    pub fn propose(&self, proposer: &str, record: Record) -> Result<Proposal, AttestationError> {
        record.validate()?;
        let member = self
            .roster
            .get(proposer)
            .ok_or_else(|| AttestationError::UnknownProposer(proposer.to_string()))?;

        let signature = sign(
            &record.commit_message(),
            member.keypair().private_key(),
            COMMIT_HASH_DOMAIN,
        )?;
        Ok(Proposal {
            proposer: member.code().to_string(),
            record,
            signature,
        })
    }

    /// Runs a PoA round over `record` with inline review.
    pub fn propose_and_commit(
        &self,
        proposer: &str,
        record: Record,
    ) -> Result<ConsensusOutcome, AttestationError> {
        let proposal = self.propose(proposer, record)?;
        let (proposer, record, signature) = (
            proposal.proposer.clone(),
            proposal.record.clone(),
            proposal.signature.clone(),
        );
        let decision = run_round(&self.roster, proposal, self.validator.as_ref())?;
        Ok(ConsensusOutcome::from_decision(
            decision,
            proposer,
            record,
            signature,
            &self.roster.codes(),
        ))
    }

    /// Like [`propose_and_commit`](Self::propose_and_commit), with each vote
    /// gathered concurrently under the configured per-vote timeout.
    pub async fn propose_and_commit_async(
        &self,
        proposer: &str,
        record: Record,
    ) -> Result<ConsensusOutcome, AttestationError> {
        let proposal = self.propose(proposer, record)?;
        let (proposer, record, signature) = (
            proposal.proposer.clone(),
            proposal.record.clone(),
            proposal.signature.clone(),
        );
        let decision = run_round_async(
            &self.roster,
            proposal,
            Arc::clone(&self.validator),
            Duration::from_millis(self.config.vote_timeout_ms),
        )
        .await?;
        Ok(ConsensusOutcome::from_decision(
            decision,
            proposer,
            record,
            signature,
            &self.roster.codes(),
        ))
    }

    // -- Query-attestation flow ---------------------------------------------

    /// Attests to `item_id` across the roster and encrypts the reference
    /// member's message for `requestor_public`.
    ///
    /// A missing or divergent record stops the flow before any cryptography
    /// runs. A failed aggregate check is reported as `verified: false`.
    pub fn query_and_attest(
        &self,
        lookup: &dyn RecordLookup,
        item_id: &str,
        requestor_public: &RsaPublicKey,
    ) -> Result<AttestationOutcome, AttestationError> {
        let view = check_consistency(&self.roster, item_id, lookup)?;

        let mut session = MultisigSession::new(self.pkg.modulus().clone(), QUERY_HASH_DOMAIN)?;
        for (member, (_, record)) in self.roster.iter().zip(&view.holdings) {
            session.contribute(member.participant(), record.attestation_message())?;
        }
        let aggregate_signature = session.finalize()?.clone();
        let verified = session.verify()?;

        let message = view.record.attestation_message();
        let ciphertext = encrypt(&message, requestor_public)?;
        let recovered_plaintext = if requestor_public == self.requestor.public_key() {
            Some(decrypt(&ciphertext, self.requestor.private_key())?)
        } else {
            None
        };

        if verified {
            info!(
                session = %session.id(),
                item_id,
                signers = aggregate_signature.signers().len(),
                "aggregate signature verified"
            );
        } else {
            warn!(session = %session.id(), item_id, "aggregate signature rejected");
        }

        Ok(AttestationOutcome {
            session_id: session.id(),
            item_id: item_id.to_string(),
            message,
            statements: session.statements().to_vec(),
            partials: session.partials().to_vec(),
            aggregate_signature,
            verified,
            ciphertext,
            recovered_plaintext,
            attested_at: chrono::Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::VoteDecision;
    use crate::inventory::consistency::ConsistencyError;
    use crate::inventory::record::seed_records;
    use crate::multisig::session::SESSIONS_OPENED;
    use crate::roster::RosterMember;
    use crate::storage::{MemoryStore, RecordStore};
    use num_bigint::BigUint;

    const DEMO_AGGREGATE: &str = "756117678570418895122518954672969503419040241833203249302519956579165131409007943512966905";

    fn orchestrator() -> Orchestrator {
        Orchestrator::new(AttestationConfig::demo()).unwrap()
    }

    fn store() -> MemoryStore {
        MemoryStore::replicated(&["A", "B", "C", "D"], &seed_records()).unwrap()
    }

    struct RejectAll;

    impl Validator for RejectAll {
        fn review(&self, _: &RosterMember, _: &Proposal, _: &RsaPublicKey) -> VoteDecision {
            VoteDecision::Reject
        }
    }

    #[test]
    fn test_query_demo_scenario() {
        let orch = orchestrator();
        let out = orch
            .query_and_attest(&store(), "001", orch.requestor_public())
            .unwrap();

        assert!(out.verified);
        assert_eq!(
            out.recovered_plaintext.as_deref(),
            Some("Item: 001, QTY: 32, Location: D")
        );
        assert_eq!(
            out.aggregate_signature.value(),
            &DEMO_AGGREGATE.parse::<BigUint>().unwrap()
        );
        assert_eq!(out.partials.len(), 4);
        assert_eq!(out.aggregate_signature.signers(), &[126, 127, 128, 129]);
    }

    #[test]
    fn test_foreign_requestor_gets_no_plaintext() {
        let orch = orchestrator();
        let foreign = orch.roster().get("B").unwrap().public_key().clone();
        let out = orch.query_and_attest(&store(), "002", &foreign).unwrap();
        assert!(out.verified);
        assert!(out.recovered_plaintext.is_none());
    }

    fn sessions_opened() -> usize {
        SESSIONS_OPENED.with(|n| n.get())
    }

    #[test]
    fn test_query_stops_on_mismatch() {
        let orch = orchestrator();
        let s = store();
        s.put("D", &Record::new("001", 32, 99, "D")).unwrap();
        let before = sessions_opened();
        let err = orch
            .query_and_attest(&s, "001", orch.requestor_public())
            .unwrap_err();
        assert!(err.is_record_failure());
        assert!(matches!(
            err,
            AttestationError::Consistency(ConsistencyError::RecordMismatch { .. })
        ));
        assert_eq!(sessions_opened(), before, "no multisig session on mismatch");
    }

    #[test]
    fn test_missing_record_opens_no_session() {
        let orch = orchestrator();
        let s = store();
        s.replace_all("C", &[]).unwrap();
        let before = sessions_opened();
        assert!(orch
            .query_and_attest(&s, "001", orch.requestor_public())
            .is_err());
        assert_eq!(sessions_opened(), before);
    }

    #[test]
    fn test_consistent_query_opens_one_session() {
        let orch = orchestrator();
        let before = sessions_opened();
        let out = orch
            .query_and_attest(&store(), "002", orch.requestor_public())
            .unwrap();
        assert!(out.verified);
        assert_eq!(sessions_opened(), before + 1);
    }

    #[test]
    fn test_query_unknown_item() {
        let orch = orchestrator();
        let err = orch
            .query_and_attest(&store(), "404", orch.requestor_public())
            .unwrap_err();
        match err {
            AttestationError::Consistency(ConsistencyError::RecordNotFound { member, .. }) => {
                assert_eq!(member, "A")
            }
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_commit_issues_persist_per_member() {
        let orch = orchestrator();
        let s = store();
        let out = orch
            .propose_and_commit("Inventory C", Record::new("005", 300, 22, "C"))
            .unwrap();
        assert!(out.committed);
        assert_eq!(out.proposer, "C");
        assert_eq!(out.vote_count, 4);
        assert_eq!(out.persist.len(), 4);

        assert_eq!(out.apply(&s).unwrap(), 4);
        for code in ["A", "B", "C", "D"] {
            assert_eq!(s.get(code, "005").unwrap().unwrap().qty, 300);
        }
    }

    #[test]
    fn test_rejected_round_persists_nothing() {
        let orch = orchestrator().with_validator(Arc::new(RejectAll));
        let out = orch
            .propose_and_commit("A", Record::new("005", 300, 22, "A"))
            .unwrap();
        assert!(!out.committed);
        assert_eq!(out.vote_count, 1);
        assert!(out.persist.is_empty());
    }

    #[test]
    fn test_unknown_proposer() {
        let err = orchestrator()
            .propose_and_commit("Inventory Q", Record::new("005", 1, 1, "Q"))
            .unwrap_err();
        assert!(matches!(err, AttestationError::UnknownProposer(_)));
    }

    #[test]
    fn test_invalid_record_refused_before_signing() {
        let err = orchestrator()
            .propose_and_commit("A", Record::new("", 1, 1, "A"))
            .unwrap_err();
        assert!(matches!(err, AttestationError::InvalidRecord(_)));
    }

    #[tokio::test]
    async fn test_async_commit() {
        let orch = orchestrator();
        let out = orch
            .propose_and_commit_async("B", Record::new("002", 25, 14, "B"))
            .await
            .unwrap();
        assert!(out.committed);
        assert!(out
            .votes
            .iter()
            .all(|v| v.decision == VoteDecision::Accept));
    }

    #[test]
    fn test_bad_pkg_key_named() {
        let mut cfg = AttestationConfig::demo();
        cfg.pkg.e = BigUint::from(1u8);
        match Orchestrator::new(cfg).unwrap_err() {
            AttestationError::Key { party, .. } => assert_eq!(party, "PKG"),
            other => panic!("unexpected: {other}"),
        }
    }
}
