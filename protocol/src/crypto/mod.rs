//! # Cryptographic Primitives for StockProof
//!
//! Everything the attestation layer signs, verifies, or encrypts flows
//! through here:
//!
//! - **bignum** — exact gcd / modular inverse / modular exponentiation.
//! - **hash** — text to integer, in one of two explicit hash domains.
//! - **keys** — RSA key derivation from provisioned `(p, q, e)`.
//! - **signatures** — hash-then-exponentiate RSA sign/verify.
//! - **encryption** — raw RSA over UTF-8 text.
//!
//! ## A note on strength
//!
//! These are textbook constructions over ~300-bit moduli with fixed,
//! provisioned keys. They reproduce the attestation protocol faithfully.
//! They are not a general-purpose RSA implementation and should never be
//! used as one.

pub mod bignum;
pub mod encryption;
pub mod hash;
pub mod keys;
pub mod signatures;

pub use bignum::{gcd, mod_inverse, mod_pow, ArithmeticError};
pub use encryption::{decrypt, encrypt, Ciphertext, EncryptionError};
pub use hash::{hash_to_int, HashDomain};
pub use keys::{generate_keypair, KeyError, KeyMaterial, RsaKeypair, RsaPrivateKey, RsaPublicKey};
pub use signatures::{sign, verify, RsaSignature};
