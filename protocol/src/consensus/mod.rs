//! # Proof-of-Authority Consensus Gate
//!
//! Decides whether a record proposed by one roster member may be committed
//! to every member's store.
//!
//! ## How it works
//!
//! 1. **Proposal**: the proposer signs the record's commit message under the
//!    64-bit MD5 domain and opens a round. Opening the round casts the
//!    proposer's implicit accepting vote.
//! 2. **Review**: every other member independently re-runs `verify` against
//!    the proposer's public key and votes accept or reject.
//! 3. **Tally**: the round commits iff accepting votes reach the configured
//!    quorum. The quorum is an absolute count, not a fraction of the roster.
//!
//! ## Round State Machine
//!
//! ```text
//! Proposed ──► Committed
//!     │
//!     └──────► Rejected
//! ```
//!
//! Both outcomes are terminal and neither is an error. The gate never touches
//! storage; on commit the caller is handed one persistence instruction per
//! member.
//!
//! Review runs either inline ([`gate::run_round`]) or fanned out over the
//! blocking pool with a per-vote timeout ([`fanout::run_round_async`]). A vote
//! that never arrives counts against the proposal.

pub mod fanout;
pub mod gate;

pub use fanout::{gather_votes, run_round_async};
pub use gate::{
    run_round, ConsensusError, ConsensusRound, HonestValidator, Proposal, RoundDecision,
    RoundState, Validator, Vote, VoteDecision,
};
