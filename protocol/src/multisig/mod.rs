//! # Harn-Style Multisignatures
//!
//! Every roster member contributes a partial signature over its own view of
//! the queried record. The partials sum into one aggregate that a verifier can
//! check against the public roster without seeing any partial individually.
//!
//! ## Protocol
//!
//! Over the shared PKG modulus `n`, for node `i` with identity `id_i`, nonce
//! `r_i` and message `m_i`:
//!
//! ```text
//! partial_i = H(m_i || "::" || id_i) * id_i^r_i  mod n
//! aggregate = sum(partial_i)                    mod n
//! verify:     aggregate == sum(H(m_i || "::" || id_i) * id_i^r_i) mod n
//! ```
//!
//! Messages may differ per node; verification is over the per-node statement
//! set. Summation is commutative, so partials can arrive in any order.
//!
//! ## Nonce reuse
//!
//! Nonces are pre-shared, fixed parameters here and are reused by every
//! session. That reproduces the protocol exactly, and it is also a real
//! weakness: a production deployment must draw fresh, independent nonces per
//! session. The mechanics below do not care where the nonces come from, so
//! changing the convention is a provisioning change, not a code change.
//!
//! ## Failure modes
//!
//! A mismatched aggregate is `Ok(false)`, an attestation rejection. Only
//! degenerate inputs (zero modulus, zero identity) are errors.

pub mod aggregate;
pub mod partial;
pub mod session;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use aggregate::{aggregate, verify_aggregate, AggregateSignature};
pub use partial::{generate_partial, PartialSignature};
pub use session::MultisigSession;

/// Errors raised by the multisignature engine. All of them are domain errors
/// on the inputs; a failed verification is never an error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MultisigError {
    #[error("multisignature modulus must be positive")]
    NonPositiveModulus,

    #[error("participant identity must be non-zero")]
    ZeroIdentity,

    #[error("session already finalized")]
    AlreadyFinalized,

    #[error("session has no contributions to aggregate")]
    EmptySession,
}

/// A member's public `(identity, nonce)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Participant {
    pub identity: u64,
    pub nonce: u64,
}

/// What one participant attests to: its parameters and its message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    pub participant: Participant,
    pub message: String,
}

impl Statement {
    pub fn new(participant: Participant, message: impl Into<String>) -> Self {
        Self {
            participant,
            message: message.into(),
        }
    }
}
