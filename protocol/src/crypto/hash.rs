//! # Message Hashing into the Integer Domain
//!
//! RSA and the Harn scheme both operate on integers, so every message is
//! hashed to a `BigUint` before anything else happens. StockProof uses two
//! hash domains and they are deliberately NOT interchangeable:
//!
//! | Domain | Construction | Used by |
//! |--------|--------------|---------|
//! | [`HashDomain::Md5Trunc64`] | first 8 bytes of MD5, big-endian | record-commit signatures (PoA gate) |
//! | [`HashDomain::Sha256Full`] | full SHA-256, big-endian | Harn partial signatures (query attestation) |
//!
//! A signature produced under one domain will not verify under the other.
//! The domain is therefore an explicit argument everywhere; there is no
//! default, so the two flows cannot be cross-wired by accident.
//!
//! ## Salting
//!
//! Partial signatures bind the node identity into the digest by appending
//! `"::{identity}"` to the message text before hashing.

use md5::Md5;
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::config::{MD5_TRUNCATED_BYTES, PARTIAL_SALT_SEPARATOR};

/// Selects which hash function maps text to integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashDomain {
    /// MD5 truncated to its leading 64 bits. Fast, weak, and only used for
    /// record-commit attestations.
    Md5Trunc64,
    /// Full 256-bit SHA-256. Used for multisignature partials.
    Sha256Full,
}

impl HashDomain {
    /// Width of the integer domain in bits.
    pub fn bits(self) -> u32 {
        match self {
            Self::Md5Trunc64 => 64,
            Self::Sha256Full => 256,
        }
    }

    /// Raw digest bytes of `data` under this domain.
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Md5Trunc64 => {
                let full = Md5::digest(data);
                full[..MD5_TRUNCATED_BYTES].to_vec()
            }
            Self::Sha256Full => Sha256::digest(data).to_vec(),
        }
    }
}

impl std::fmt::Display for HashDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Md5Trunc64 => f.write_str("md5-64"),
            Self::Sha256Full => f.write_str("sha256"),
        }
    }
}

/// Builds the text that actually gets hashed: the message, optionally
/// followed by `"::{salt}"`.
pub fn salted_message(message: &str, salt: Option<u64>) -> String {
    match salt {
        Some(salt) => format!("{message}{PARTIAL_SALT_SEPARATOR}{salt}"),
        None => message.to_string(),
    }
}

/// Deterministically maps `message` (plus optional salt) to an integer in
/// `[0, 2^domain.bits())`.
///
/// # Example
///
/// ```
/// use stockproof_protocol::crypto::hash::{hash_to_int, HashDomain};
///
/// let a = hash_to_int("ID001,32,12", None, HashDomain::Md5Trunc64);
/// let b = hash_to_int("ID001,32,12", None, HashDomain::Sha256Full);
/// assert_ne!(a, b);
/// assert!(a.bits() <= 64);
/// ```
pub fn hash_to_int(message: &str, salt: Option<u64>, domain: HashDomain) -> BigUint {
    let text = salted_message(message, salt);
    BigUint::from_bytes_be(&domain.digest(text.as_bytes()))
}

/// Hex rendering of a domain digest, for logs.
pub fn digest_hex(message: &str, salt: Option<u64>, domain: HashDomain) -> String {
    hex::encode(domain.digest(salted_message(message, salt).as_bytes()))
}
