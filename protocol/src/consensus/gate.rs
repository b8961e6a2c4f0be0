//! Round bookkeeping and the synchronous review path.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::COMMIT_HASH_DOMAIN;
use crate::crypto::hash::digest_hex;
use crate::crypto::keys::RsaPublicKey;
use crate::crypto::signatures::{verify, RsaSignature};
use crate::inventory::record::Record;
use crate::roster::{Roster, RosterMember};

// ---------------------------------------------------------------------------
// Round State
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundState {
    /// Votes are still being collected.
    Proposed,
    /// Quorum reached. Persist everywhere.
    Committed,
    /// Quorum missed. Persist nowhere.
    Rejected,
}

impl RoundState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Proposed)
    }
}

impl fmt::Display for RoundState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Proposed => write!(f, "proposed"),
            Self::Committed => write!(f, "committed"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

// ---------------------------------------------------------------------------
// Votes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteDecision {
    Accept,
    Reject,
    /// The reviewer timed out or failed. Counts as a reject.
    NotReceived,
}

impl VoteDecision {
    pub fn is_accept(self) -> bool {
        matches!(self, Self::Accept)
    }
}

impl fmt::Display for VoteDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::Reject => write!(f, "reject"),
            Self::NotReceived => write!(f, "not received"),
        }
    }
}

/// One member's vote in a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub member: String,
    pub decision: VoteDecision,
    /// `true` only for the proposer's own vote.
    pub implicit: bool,
}

impl Vote {
    pub fn new(member: impl Into<String>, decision: VoteDecision) -> Self {
        Self {
            member: member.into(),
            decision,
            implicit: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Proposal
// ---------------------------------------------------------------------------

/// A signed record put up for a vote.
///
/// The signature covers `record.commit_message()`. There is no separate
/// message field, so reviewers always verify the record that gets persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub proposer: String,
    pub record: Record,
    pub signature: RsaSignature,
}

impl Proposal {
    /// The text the signature must cover.
    pub fn message(&self) -> String {
        self.record.commit_message()
    }
}

/// How a roster member reviews a proposal.
///
/// The production reviewer is [`HonestValidator`]. Tests inject reviewers
/// that reject, stall or panic to exercise the tally.
pub trait Validator: Send + Sync {
    fn review(
        &self,
        reviewer: &RosterMember,
        proposal: &Proposal,
        proposer_key: &RsaPublicKey,
    ) -> VoteDecision;
}

/// Re-runs RSA verification of the proposer's signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct HonestValidator;

impl Validator for HonestValidator {
    fn review(
        &self,
        reviewer: &RosterMember,
        proposal: &Proposal,
        proposer_key: &RsaPublicKey,
    ) -> VoteDecision {
        let message = proposal.message();
        let ok = verify(&message, &proposal.signature, proposer_key, COMMIT_HASH_DOMAIN);
        debug!(
            reviewer = reviewer.code(),
            proposer = %proposal.proposer,
            digest = %digest_hex(&message, None, COMMIT_HASH_DOMAIN),
            accepted = ok,
            "proposal reviewed"
        );
        if ok {
            VoteDecision::Accept
        } else {
            VoteDecision::Reject
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Misuse of a round. A rejected proposal is *not* an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    #[error("proposer {0} is not on the roster")]
    UnknownProposer(String),

    #[error("vote from non-member: {0}")]
    VoteFromNonMember(String),

    #[error("duplicate vote from {0}")]
    DuplicateVote(String),

    #[error("round {0} is already closed")]
    RoundClosed(Uuid),
}

// ---------------------------------------------------------------------------
// Consensus Round
// ---------------------------------------------------------------------------

/// Ephemeral state for one proposal. Never persisted.
#[derive(Debug, Clone)]
pub struct ConsensusRound {
    id: Uuid,
    proposal: Proposal,
    members: Vec<String>,
    quorum: usize,
    state: RoundState,
    votes: Vec<Vote>,
}

/// The terminal result of a round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundDecision {
    pub round_id: Uuid,
    pub state: RoundState,
    pub accepts: usize,
    pub quorum: usize,
    pub votes: Vec<Vote>,
}

impl RoundDecision {
    pub fn committed(&self) -> bool {
        self.state == RoundState::Committed
    }
}

impl ConsensusRound {
    /// Opens a round and records the proposer's implicit accept.
    pub fn open(roster: &Roster, proposal: Proposal) -> Result<Self, ConsensusError> {
        if roster.get(&proposal.proposer).is_none() {
            return Err(ConsensusError::UnknownProposer(proposal.proposer.clone()));
        }

        let implicit = Vote {
            member: proposal.proposer.clone(),
            decision: VoteDecision::Accept,
            implicit: true,
        };
        let round = Self {
            id: Uuid::new_v4(),
            members: roster.codes().into_iter().map(str::to_string).collect(),
            quorum: roster.quorum(),
            state: RoundState::Proposed,
            votes: vec![implicit],
            proposal,
        };
        debug!(round = %round.id, proposer = %round.proposal.proposer, "round opened");
        Ok(round)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn proposal(&self) -> &Proposal {
        &self.proposal
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn votes(&self) -> &[Vote] {
        &self.votes
    }

    /// Accepting votes so far, proposer included.
    pub fn accepts(&self) -> usize {
        self.votes.iter().filter(|v| v.decision.is_accept()).count()
    }

    /// Adds a reviewer's vote. Each member votes at most once.
    pub fn record_vote(&mut self, vote: Vote) -> Result<(), ConsensusError> {
        if self.state.is_terminal() {
            return Err(ConsensusError::RoundClosed(self.id));
        }
        if !self.members.iter().any(|m| *m == vote.member) {
            return Err(ConsensusError::VoteFromNonMember(vote.member));
        }
        if self.votes.iter().any(|v| v.member == vote.member) {
            return Err(ConsensusError::DuplicateVote(vote.member));
        }
        debug!(round = %self.id, member = %vote.member, decision = %vote.decision, "vote recorded");
        self.votes.push(vote);
        Ok(())
    }

    /// Tallies and moves the round to its terminal state.
    ///
    /// Members that never voted are recorded as `NotReceived`.
    pub fn close(mut self) -> RoundDecision {
        let seen: HashSet<String> = self.votes.iter().map(|v| v.member.clone()).collect();
        for member in &self.members {
            if !seen.contains(member) {
                self.votes
                    .push(Vote::new(member.clone(), VoteDecision::NotReceived));
            }
        }

        let accepts = self.accepts();
        self.state = if accepts >= self.quorum {
            RoundState::Committed
        } else {
            RoundState::Rejected
        };

        if self.state == RoundState::Committed {
            info!(
                round = %self.id,
                proposer = %self.proposal.proposer,
                item_id = %self.proposal.record.id,
                votes = accepts,
                quorum = self.quorum,
                "proposal committed"
            );
        } else {
            warn!(
                round = %self.id,
                proposer = %self.proposal.proposer,
                item_id = %self.proposal.record.id,
                votes = accepts,
                quorum = self.quorum,
                "proposal rejected"
            );
        }

        RoundDecision {
            round_id: self.id,
            state: self.state,
            accepts,
            quorum: self.quorum,
            votes: self.votes,
        }
    }
}

/// Runs a full round inline: every non-proposer member reviews in roster
/// order, then the round is tallied.
pub fn run_round(
    roster: &Roster,
    proposal: Proposal,
    validator: &dyn Validator,
) -> Result<RoundDecision, ConsensusError> {
    let proposer_key = roster
        .get(&proposal.proposer)
        .map(|m| m.public_key().clone())
        .ok_or_else(|| ConsensusError::UnknownProposer(proposal.proposer.clone()))?;

    let mut round = ConsensusRound::open(roster, proposal)?;
    for member in roster.iter() {
        if member.code() == round.proposal().proposer {
            continue;
        }
        let decision = validator.review(member, round.proposal(), &proposer_key);
        round.record_vote(Vote::new(member.code(), decision))?;
    }
    Ok(round.close())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::config::AttestationConfig;
    use crate::crypto::signatures::sign;

    pub(crate) fn demo_roster() -> Roster {
        Roster::from_config(&AttestationConfig::demo()).unwrap()
    }

    pub(crate) fn signed_proposal(roster: &Roster, proposer: &str, record: Record) -> Proposal {
        let message = record.commit_message();
        let key = roster.get(proposer).unwrap().keypair().private_key();
        let signature = sign(&message, key, COMMIT_HASH_DOMAIN).unwrap();
        Proposal {
            proposer: proposer.to_string(),
            record,
            signature,
        }
    }

    /// Rejects for the listed members, verifies honestly for everyone else.
    pub(crate) struct Faulty(pub Vec<&'static str>);

    impl Validator for Faulty {
        fn review(
            &self,
            reviewer: &RosterMember,
            proposal: &Proposal,
            proposer_key: &RsaPublicKey,
        ) -> VoteDecision {
            if self.0.iter().any(|code| *code == reviewer.code()) {
                VoteDecision::Reject
            } else {
                HonestValidator.review(reviewer, proposal, proposer_key)
            }
        }
    }

    #[test]
    fn honest_round_commits_unanimously() {
        let roster = demo_roster();
        let p = signed_proposal(&roster, "B", Record::new("005", 300, 22, "B"));
        let d = run_round(&roster, p, &HonestValidator).unwrap();
        assert!(d.committed());
        assert_eq!(d.accepts, 4);
        assert_eq!(d.votes.len(), 4);
        assert!(d.votes[0].implicit);
        assert_eq!(d.votes[0].member, "B");
    }

    #[test]
    fn three_of_four_commits() {
        let roster = demo_roster();
        let p = signed_proposal(&roster, "A", Record::new("001", 40, 12, "A"));
        let d = run_round(&roster, p, &Faulty(vec!["D"])).unwrap();
        assert_eq!(d.state, RoundState::Committed);
        assert_eq!(d.accepts, 3);
    }

    #[test]
    fn exactly_two_accepts_rejects() {
        let roster = demo_roster();
        let p = signed_proposal(&roster, "A", Record::new("001", 40, 12, "A"));
        let d = run_round(&roster, p, &Faulty(vec!["C", "D"])).unwrap();
        assert_eq!(d.state, RoundState::Rejected);
        assert_eq!(d.accepts, 2);
    }

    #[test]
    fn tampered_record_rejected_by_every_peer() {
        let roster = demo_roster();
        let mut p = signed_proposal(&roster, "C", Record::new("002", 20, 14, "C"));
        p.record.qty = 2000;
        let d = run_round(&roster, p, &HonestValidator).unwrap();
        assert!(!d.committed());
        assert_eq!(d.accepts, 1);
    }

    #[test]
    fn record_swapped_after_signing_never_commits() {
        let roster = demo_roster();
        let mut p = signed_proposal(&roster, "A", Record::new("001", 1, 1, "A"));
        p.record = Record::new("001", 999_999, 0, "A");
        let d = run_round(&roster, p, &HonestValidator).unwrap();
        assert_eq!(d.state, RoundState::Rejected);
        assert_eq!(d.accepts, 1);
        assert!(d
            .votes
            .iter()
            .filter(|v| !v.implicit)
            .all(|v| v.decision == VoteDecision::Reject));
    }

    #[test]
    fn signature_from_wrong_member_rejected() {
        let roster = demo_roster();
        let mut p = signed_proposal(&roster, "A", Record::new("003", 1, 1, "A"));
        p.proposer = "B".into();
        let d = run_round(&roster, p, &HonestValidator).unwrap();
        assert_eq!(d.state, RoundState::Rejected);
    }

    #[test]
    fn unknown_proposer_is_an_error() {
        let roster = demo_roster();
        let mut p = signed_proposal(&roster, "A", Record::new("003", 1, 1, "A"));
        p.proposer = "Z".into();
        assert_eq!(
            run_round(&roster, p, &HonestValidator).unwrap_err(),
            ConsensusError::UnknownProposer("Z".into())
        );
    }

    #[test]
    fn round_bookkeeping() {
        let roster = demo_roster();
        let p = signed_proposal(&roster, "A", Record::new("001", 1, 1, "A"));
        let mut round = ConsensusRound::open(&roster, p).unwrap();
        assert_eq!(round.state(), RoundState::Proposed);
        assert_eq!(round.accepts(), 1);

        assert_eq!(
            round.record_vote(Vote::new("A", VoteDecision::Accept)),
            Err(ConsensusError::DuplicateVote("A".into()))
        );
        assert_eq!(
            round.record_vote(Vote::new("E", VoteDecision::Accept)),
            Err(ConsensusError::VoteFromNonMember("E".into()))
        );
        round
            .record_vote(Vote::new("B", VoteDecision::Accept))
            .unwrap();

        // C and D never vote.
        let d = round.close();
        assert_eq!(d.state, RoundState::Rejected);
        assert_eq!(
            d.votes
                .iter()
                .filter(|v| v.decision == VoteDecision::NotReceived)
                .count(),
            2
        );
    }

    #[test]
    fn quorum_is_absolute() {
        let mut cfg = AttestationConfig::demo();
        cfg.quorum = 1;
        let roster = Roster::from_config(&cfg).unwrap();
        let p = signed_proposal(&roster, "D", Record::new("009", 1, 1, "D"));
        let d = run_round(&roster, p, &Faulty(vec!["A", "B", "C"])).unwrap();
        assert!(d.committed());
    }
}
