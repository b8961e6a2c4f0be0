//! Per-node partial signature generation.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::{MultisigError, Participant};
use crate::crypto::bignum::{self, mod_pow};
use crate::crypto::hash::{hash_to_int, HashDomain};

/// One node's contribution to an aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialSignature {
    identity: u64,
    #[serde(with = "bignum::decimal")]
    value: BigUint,
}

impl PartialSignature {
    pub fn from_parts(identity: u64, value: BigUint) -> Self {
        Self { identity, value }
    }

    /// Identity of the contributing node.
    pub fn identity(&self) -> u64 {
        self.identity
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }
}

/// `H(message || "::" || id) * id^r mod n`.
///
/// Shared by signing and verification so both sides compute exactly the
/// same term.
pub(crate) fn partial_term(
    participant: &Participant,
    message: &str,
    modulus: &BigUint,
    domain: HashDomain,
) -> Result<BigUint, MultisigError> {
    if modulus.is_zero() {
        return Err(MultisigError::NonPositiveModulus);
    }
    if participant.identity == 0 {
        return Err(MultisigError::ZeroIdentity);
    }

    let h = hash_to_int(message, Some(participant.identity), domain);
    let id = BigUint::from(participant.identity);
    let r = BigUint::from(participant.nonce);
    let blind = mod_pow(&id, &r, modulus).map_err(|_| MultisigError::NonPositiveModulus)?;
    Ok((h * blind) % modulus)
}

/// Generates `participant`'s partial signature over `message`.
pub fn generate_partial(
    participant: &Participant,
    message: &str,
    modulus: &BigUint,
    domain: HashDomain,
) -> Result<PartialSignature, MultisigError> {
    let value = partial_term(participant, message, modulus, domain)?;
    Ok(PartialSignature {
        identity: participant.identity,
        value,
    })
}
