//! Concurrent review: each member's vote runs on the blocking pool under its
//! own timeout, and votes are collected in whatever order they finish.
//!
//! A reviewer that times out or panics yields [`VoteDecision::NotReceived`],
//! which counts against the proposal. Counting is order-independent, so the
//! decision matches the inline path whenever every vote arrives.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::warn;

use super::gate::{
    ConsensusError, ConsensusRound, Proposal, RoundDecision, Validator, Vote, VoteDecision,
};
use crate::roster::Roster;

/// Collects one vote from every non-proposer member.
pub async fn gather_votes(
    roster: &Roster,
    proposal: Arc<Proposal>,
    validator: Arc<dyn Validator>,
    per_vote: Duration,
) -> Result<Vec<Vote>, ConsensusError> {
    let proposer_key = roster
        .get(&proposal.proposer)
        .map(|m| m.public_key().clone())
        .ok_or_else(|| ConsensusError::UnknownProposer(proposal.proposer.clone()))?;

    let pending = roster
        .iter()
        .filter(|m| m.code() != proposal.proposer)
        .cloned()
        .map(|member| {
            let proposal = Arc::clone(&proposal);
            let validator = Arc::clone(&validator);
            let key = proposer_key.clone();
            async move {
                let code = member.code().to_string();
                let handle = tokio::task::spawn_blocking(move || {
                    validator.review(&member, &proposal, &key)
                });
                let decision = match tokio::time::timeout(per_vote, handle).await {
                    Ok(Ok(decision)) => decision,
                    Ok(Err(e)) => {
                        warn!(member = %code, error = %e, "reviewer failed");
                        VoteDecision::NotReceived
                    }
                    Err(_) => {
                        warn!(member = %code, timeout_ms = per_vote.as_millis() as u64, "vote timed out");
                        VoteDecision::NotReceived
                    }
                };
                Vote::new(code, decision)
            }
        });

    Ok(join_all(pending).await)
}

/// [`run_round`](super::gate::run_round) with fanned-out review.
pub async fn run_round_async(
    roster: &Roster,
    proposal: Proposal,
    validator: Arc<dyn Validator>,
    per_vote: Duration,
) -> Result<RoundDecision, ConsensusError> {
    let mut round = ConsensusRound::open(roster, proposal)?;
    let votes = gather_votes(
        roster,
        Arc::new(round.proposal().clone()),
        validator,
        per_vote,
    )
    .await?;
    for vote in votes {
        round.record_vote(vote)?;
    }
    Ok(round.close())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consensus::gate::tests::{demo_roster, signed_proposal, Faulty};
    use crate::consensus::gate::{HonestValidator, RoundState};
    use crate::crypto::keys::RsaPublicKey;
    use crate::inventory::record::Record;
    use crate::roster::RosterMember;

    struct Stalls(&'static str);

    impl Validator for Stalls {
        fn review(
            &self,
            reviewer: &RosterMember,
            proposal: &Proposal,
            proposer_key: &RsaPublicKey,
        ) -> VoteDecision {
            if reviewer.code() == self.0 {
                std::thread::sleep(Duration::from_millis(500));
            }
            HonestValidator.review(reviewer, proposal, proposer_key)
        }
    }

    struct Panics;

    impl Validator for Panics {
        fn review(&self, reviewer: &RosterMember, _: &Proposal, _: &RsaPublicKey) -> VoteDecision {
            if reviewer.code() == "C" {
                panic!("reviewer crashed");
            }
            VoteDecision::Accept
        }
    }

    #[tokio::test]
    async fn fanout_matches_inline_decision() {
        let roster = demo_roster();
        let p = signed_proposal(&roster, "A", Record::new("005", 300, 22, "A"));
        let d = run_round_async(&roster, p, Arc::new(HonestValidator), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(d.state, RoundState::Committed);
        assert_eq!(d.accepts, 4);
    }

    #[tokio::test]
    async fn two_rejects_reject_async() {
        let roster = demo_roster();
        let p = signed_proposal(&roster, "B", Record::new("001", 1, 1, "B"));
        let d = run_round_async(
            &roster,
            p,
            Arc::new(Faulty(vec!["A", "D"])),
            Duration::from_secs(5),
        )
        .await
        .unwrap();
        assert_eq!(d.state, RoundState::Rejected);
    }

    #[tokio::test]
    async fn timed_out_vote_is_not_received() {
        let roster = demo_roster();
        let p = signed_proposal(&roster, "A", Record::new("002", 1, 1, "A"));
        let votes = gather_votes(
            &roster,
            Arc::new(p),
            Arc::new(Stalls("D")),
            Duration::from_millis(50),
        )
        .await
        .unwrap();

        assert_eq!(votes.len(), 3);
        let d = votes.iter().find(|v| v.member == "D").unwrap();
        assert_eq!(d.decision, VoteDecision::NotReceived);
        assert!(votes
            .iter()
            .filter(|v| v.member != "D")
            .all(|v| v.decision == VoteDecision::Accept));
    }

    #[tokio::test]
    async fn one_missing_vote_still_commits() {
        let roster = demo_roster();
        let p = signed_proposal(&roster, "A", Record::new("002", 1, 1, "A"));
        let d = run_round_async(&roster, p, Arc::new(Stalls("B")), Duration::from_millis(50))
            .await
            .unwrap();
        assert!(d.committed());
        assert_eq!(d.accepts, 3);
    }

    #[tokio::test]
    async fn panicked_reviewer_is_not_received() {
        let roster = demo_roster();
        let p = signed_proposal(&roster, "A", Record::new("002", 1, 1, "A"));
        let votes = gather_votes(&roster, Arc::new(p), Arc::new(Panics), Duration::from_secs(5))
            .await
            .unwrap();
        let c = votes.iter().find(|v| v.member == "C").unwrap();
        assert_eq!(c.decision, VoteDecision::NotReceived);
    }
}
