//! # RSA Encryption of Text Payloads
//!
//! Used to deliver an attested answer to the requesting party:
//!
//! ```text
//! encrypt: c = int(utf8(m))^e mod n
//! decrypt: m = utf8(bytes(c^d mod n))
//! ```
//!
//! ## Byte convention
//!
//! Plaintext bytes are read as one big-endian integer. On the way back the
//! integer is written out in its minimal big-endian form (`ceil(bits/8)`
//! bytes) and decoded as UTF-8. Consequences worth knowing:
//!
//! - Leading NUL bytes would not survive a round trip, so `encrypt` refuses
//!   text that starts with `'\0'`. Every text it accepts decrypts back exactly.
//! - The plaintext integer must be strictly below `n`, so a payload may
//!   occupy at most [`RsaPublicKey::max_plaintext_bytes`] bytes.
//!
//! No padding is applied. This is raw RSA, fit for the attestation demo and
//! nothing else.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::bignum::{self, ArithmeticError};
use super::keys::{RsaPrivateKey, RsaPublicKey};

/// Errors during encryption/decryption.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncryptionError {
    /// The plaintext integer would not be below the modulus.
    #[error("plaintext too large: {len} bytes, key capacity is {capacity} bytes")]
    PlaintextTooLarge {
        /// Plaintext length in bytes.
        len: usize,
        /// Largest length the key can carry.
        capacity: usize,
    },

    /// The plaintext starts with a NUL byte, which the minimal-length
    /// integer encoding cannot carry.
    #[error("plaintext starts with a NUL byte")]
    LeadingNul,

    /// The recovered integer does not decode to UTF-8 text.
    #[error("decrypted value is not valid UTF-8 text")]
    PlaintextDecode,

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),
}

/// An RSA ciphertext integer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ciphertext(#[serde(with = "bignum::decimal")] pub BigUint);

impl std::fmt::Display for Ciphertext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Encrypts `plaintext` under `key`.
///
/// # Errors
///
/// [`EncryptionError::LeadingNul`] if the text starts with `'\0'`, and
/// [`EncryptionError::PlaintextTooLarge`] if the encoded text is not below `n`.
pub fn encrypt(plaintext: &str, key: &RsaPublicKey) -> Result<Ciphertext, EncryptionError> {
    let bytes = plaintext.as_bytes();
    if bytes.first() == Some(&0) {
        return Err(EncryptionError::LeadingNul);
    }
    let m = bignum::bytes_to_int(bytes);
    if m >= key.n {
        return Err(EncryptionError::PlaintextTooLarge {
            len: bytes.len(),
            capacity: key.max_plaintext_bytes(),
        });
    }
    Ok(Ciphertext(bignum::mod_pow(&m, &key.e, &key.n)?))
}

/// Decrypts `ciphertext` with `key` back to text.
///
/// # Errors
///
/// [`EncryptionError::PlaintextDecode`] when the recovered bytes are not
/// UTF-8, which is what a wrong key almost always produces.
pub fn decrypt(ciphertext: &Ciphertext, key: &RsaPrivateKey) -> Result<String, EncryptionError> {
    let m = bignum::mod_pow(&ciphertext.0, key.d(), key.n())?;
    String::from_utf8(bignum::int_to_bytes(&m)).map_err(|_| EncryptionError::PlaintextDecode)
}
