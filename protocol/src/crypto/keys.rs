//! # RSA Key Material
//!
//! Textbook RSA key derivation from caller-supplied primes.
//!
//! StockProof does not generate primes. Key provisioning hands every node a
//! `(p, q, e)` triple (see [`crate::config`]) and this module derives the rest:
//!
//! ```text
//! n   = p * q
//! phi = (p - 1)(q - 1)
//! d   = e^-1 mod phi          (requires gcd(e, phi) == 1)
//! ```
//!
//! ## Security considerations
//!
//! - There is no padding. This is raw RSA over hashed messages, exactly as
//!   the attestation protocol specifies. Do not reuse these keys elsewhere.
//! - `RsaPrivateKey` has no `Debug` output for `d`. Private exponents are
//!   never logged.

use std::fmt;

use num_bigint::BigUint;
use num_traits::{One, Zero};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bignum::{self, ArithmeticError};

/// Errors raised while deriving a key pair.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// `gcd(e, phi) != 1`. The exponent has no inverse mod phi.
    #[error("public exponent is not coprime with phi(n)")]
    InvalidExponent,

    /// A prime below 2 makes phi zero and the key meaningless.
    #[error("key primes must both be at least 2")]
    DegeneratePrime,

    /// The exponent must be at least 2 to be a usable RSA exponent.
    #[error("public exponent must be greater than 1")]
    ExponentTooSmall,

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

/// The provisioned inputs: two primes and a public exponent.
///
/// Serializes with decimal-string integers so it can live in TOML.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyMaterial {
    #[serde(with = "bignum::decimal")]
    pub p: BigUint,
    #[serde(with = "bignum::decimal")]
    pub q: BigUint,
    #[serde(with = "bignum::decimal")]
    pub e: BigUint,
}

impl KeyMaterial {
    pub fn new(p: BigUint, q: BigUint, e: BigUint) -> Self {
        Self { p, q, e }
    }

    /// Parses three decimal strings. Returns `None` if any is malformed.
    pub fn from_decimal(p: &str, q: &str, e: &str) -> Option<Self> {
        Some(Self {
            p: BigUint::parse_bytes(p.as_bytes(), 10)?,
            q: BigUint::parse_bytes(q.as_bytes(), 10)?,
            e: BigUint::parse_bytes(e.as_bytes(), 10)?,
        })
    }

    /// `n = p * q`.
    pub fn modulus(&self) -> BigUint {
        &self.p * &self.q
    }

    /// `phi = (p - 1)(q - 1)`. Zero if either prime is below 2.
    pub fn phi(&self) -> BigUint {
        if self.p < BigUint::from(2u8) || self.q < BigUint::from(2u8) {
            return BigUint::zero();
        }
        (&self.p - 1u32) * (&self.q - 1u32)
    }
}

// Primes are secret. Only the public exponent is shown.
impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("p", &"<redacted>")
            .field("q", &"<redacted>")
            .field("e", &self.e)
            .finish()
    }
}

/// `(e, n)`. Safe to hand to anyone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RsaPublicKey {
    #[serde(with = "bignum::decimal")]
    pub e: BigUint,
    #[serde(with = "bignum::decimal")]
    pub n: BigUint,
}

impl RsaPublicKey {
    /// Number of whole bytes a plaintext may occupy and still be `< n`.
    pub fn max_plaintext_bytes(&self) -> usize {
        let bits = self.n.bits() as usize;
        bits.saturating_sub(1) / 8
    }
}

impl fmt::Display for RsaPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.e, self.n)
    }
}

/// `(d, n)`. Owned by exactly one node.
#[derive(Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    d: BigUint,
    n: BigUint,
}

impl RsaPrivateKey {
    pub fn d(&self) -> &BigUint {
        &self.d
    }

    pub fn n(&self) -> &BigUint {
        &self.n
    }
}

impl fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("d", &"<redacted>")
            .field("n", &self.n)
            .finish()
    }
}

/// A derived key pair together with the intermediate values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKeypair {
    public: RsaPublicKey,
    private: RsaPrivateKey,
    phi: BigUint,
}

impl RsaKeypair {
    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private
    }

    pub fn modulus(&self) -> &BigUint {
        &self.public.n
    }

    pub fn phi(&self) -> &BigUint {
        &self.phi
    }
}

/// Derives `(PublicKey, PrivateKey)` from `(p, q, e)`.
///
/// # Errors
///
/// - [`KeyError::DegeneratePrime`] if `p < 2` or `q < 2`.
/// - [`KeyError::ExponentTooSmall`] if `e < 2`.
/// - [`KeyError::InvalidExponent`] if `gcd(e, phi) != 1`.
///
/// Inputs are never adjusted and retried; a bad triple is the caller's
/// problem to fix.
///
/// # Example
///
/// ```
/// use num_bigint::BigUint;
/// use stockproof_protocol::crypto::keys::{generate_keypair, KeyMaterial};
///
/// let km = KeyMaterial::new(BigUint::from(61u32), BigUint::from(53u32), BigUint::from(17u32));
/// let kp = generate_keypair(&km).unwrap();
/// assert_eq!(kp.public_key().n, BigUint::from(3233u32));
/// assert_eq!(kp.private_key().d(), &BigUint::from(2753u32));
/// ```
pub fn generate_keypair(material: &KeyMaterial) -> Result<RsaKeypair, KeyError> {
    let phi = material.phi();
    if phi.is_zero() {
        return Err(KeyError::DegeneratePrime);
    }
    if material.e <= BigUint::one() {
        return Err(KeyError::ExponentTooSmall);
    }
    if !bignum::gcd(&material.e, &phi).is_one() {
        return Err(KeyError::InvalidExponent);
    }

    let n = material.modulus();
    let d = bignum::mod_inverse(&material.e, &phi)?;

    Ok(RsaKeypair {
        public: RsaPublicKey {
            e: material.e.clone(),
            n: n.clone(),
        },
        private: RsaPrivateKey { d, n },
        phi,
    })
}
