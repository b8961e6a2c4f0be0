//! # RSA Signatures
//!
//! Hash-then-exponentiate signing:
//!
//! ```text
//! sign:   s = H(m)^d mod n
//! verify: s^e mod n == H(m)
//! ```
//!
//! `H` is chosen by an explicit [`HashDomain`]. Signer and verifier must agree
//! on it, and nothing here picks one for you.
//!
//! Verification returns `bool`. A signature that doesn't check out is an
//! ordinary, reportable outcome (a peer votes "reject"), not an error.

use std::fmt;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::bignum::{self, ArithmeticError};
use super::hash::{hash_to_int, HashDomain};
use super::keys::{RsaPrivateKey, RsaPublicKey};

/// An RSA signature together with the hash domain it was produced under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaSignature {
    #[serde(with = "bignum::decimal")]
    value: BigUint,
    domain: HashDomain,
}

impl RsaSignature {
    pub fn from_parts(value: BigUint, domain: HashDomain) -> Self {
        Self { value, domain }
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    pub fn domain(&self) -> HashDomain {
        self.domain
    }
}

impl fmt::Display for RsaSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Signs `message` with `key` under `domain`.
///
/// # Errors
///
/// [`ArithmeticError::NonPositiveModulus`] if the key carries a zero modulus.
pub fn sign(
    message: &str,
    key: &RsaPrivateKey,
    domain: HashDomain,
) -> Result<RsaSignature, ArithmeticError> {
    let m = hash_to_int(message, None, domain);
    let value = bignum::mod_pow(&m, key.d(), key.n())?;
    Ok(RsaSignature { value, domain })
}

/// Verifies `signature` over `message` against `key`, hashing under `domain`.
///
/// A domain mismatch between the signature and the requested verification
/// domain fails closed. So does a degenerate key.
pub fn verify(
    message: &str,
    signature: &RsaSignature,
    key: &RsaPublicKey,
    domain: HashDomain,
) -> bool {
    if signature.domain != domain {
        debug!(
            signed = %signature.domain,
            requested = %domain,
            "signature hash domain mismatch"
        );
        return false;
    }

    let expected = hash_to_int(message, None, domain);
    match bignum::mod_pow(&signature.value, &key.e, &key.n) {
        Ok(recovered) => recovered == expected,
        Err(_) => false,
    }
}
