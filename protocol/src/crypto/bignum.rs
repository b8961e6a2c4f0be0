//! # Modular Arithmetic over Arbitrary-Precision Integers
//!
//! Every other primitive in StockProof bottoms out here: RSA key derivation,
//! signing, encryption and the Harn partial signatures all reduce to `gcd`,
//! a modular inverse, and modular exponentiation.
//!
//! Key material in this system runs to ~90 decimal digits per modulus and the
//! private exponents are the same size, so everything is exact `BigUint` /
//! `BigInt` arithmetic from `num-bigint`. No floats, no fixed-width integers.
//!
//! ## Exponentiation
//!
//! [`mod_pow`] is square-and-multiply over the exponent bits (via
//! `BigUint::modpow`). Naive repeated multiplication would need ~2^300 steps
//! for a real private exponent; binary exponentiation needs ~300 squarings.

use num_bigint::{BigInt, BigUint, Sign};
use num_integer::Integer;
use num_traits::{One, Signed, Zero};
use thiserror::Error;

/// Errors raised by the modular arithmetic layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArithmeticError {
    /// `gcd(value, modulus) != 1`, so no inverse exists.
    #[error("modular inverse does not exist: gcd(value, modulus) = {gcd}")]
    NoInverse {
        /// The offending gcd, for diagnostics.
        gcd: BigUint,
    },

    /// A modulus of zero was supplied. Unsigned inputs cannot be negative, so
    /// zero is the only non-positive modulus representable here.
    #[error("modulus must be positive")]
    NonPositiveModulus,
}

/// Greatest common divisor. Total for all inputs; `gcd(0, 0) == 0`.
pub fn gcd(a: &BigUint, b: &BigUint) -> BigUint {
    let mut a = a.clone();
    let mut b = b.clone();
    while !b.is_zero() {
        let r = &a % &b;
        a = b;
        b = r;
    }
    a
}

/// Extended Euclid: returns `(g, x, y)` with `a*x + b*y == g == gcd(a, b)`.
/// Iterative.
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_s, mut s) = (BigInt::one(), BigInt::zero());
    let (mut old_t, mut t) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let (q, rem) = old_r.div_rem(&r);
        old_r = std::mem::replace(&mut r, rem);
        let next_s = &old_s - &q * &s;
        old_s = std::mem::replace(&mut s, next_s);
        let next_t = &old_t - &q * &t;
        old_t = std::mem::replace(&mut t, next_t);
    }

    if old_r.is_negative() {
        (-old_r, -old_s, -old_t)
    } else {
        (old_r, old_s, old_t)
    }
}

/// Computes `d` such that `(value * d) mod modulus == 1`.
///
/// The result is normalized into `[0, modulus)`.
///
/// # Errors
///
/// - [`ArithmeticError::NonPositiveModulus`] if `modulus == 0`.
/// - [`ArithmeticError::NoInverse`] if `gcd(value, modulus) != 1`.
pub fn mod_inverse(value: &BigUint, modulus: &BigUint) -> Result<BigUint, ArithmeticError> {
    if modulus.is_zero() {
        return Err(ArithmeticError::NonPositiveModulus);
    }

    let a = BigInt::from_biguint(Sign::Plus, value.clone());
    let m = BigInt::from_biguint(Sign::Plus, modulus.clone());
    let (g, x, _) = extended_gcd(&a, &m);

    if !g.is_one() {
        return Err(ArithmeticError::NoInverse {
            gcd: g.magnitude().clone(),
        });
    }

    // mod_floor keeps the result non-negative even when x < 0.
    let d = x.mod_floor(&m);
    Ok(d.magnitude().clone())
}

/// Computes `base^exponent mod modulus`, always in `[0, modulus)`.
///
/// # Errors
///
/// [`ArithmeticError::NonPositiveModulus`] if `modulus == 0`.
pub fn mod_pow(
    base: &BigUint,
    exponent: &BigUint,
    modulus: &BigUint,
) -> Result<BigUint, ArithmeticError> {
    if modulus.is_zero() {
        return Err(ArithmeticError::NonPositiveModulus);
    }
    if modulus.is_one() {
        return Ok(BigUint::zero());
    }
    Ok(base.modpow(exponent, modulus))
}

/// Big-endian bytes to integer.
pub fn bytes_to_int(bytes: &[u8]) -> BigUint {
    BigUint::from_bytes_be(bytes)
}

/// Integer to the minimal big-endian byte string (`ceil(bits / 8)` bytes).
///
/// Zero maps to the empty byte string, matching the minimal-length
/// convention used when decrypting text payloads.
pub fn int_to_bytes(value: &BigUint) -> Vec<u8> {
    if value.is_zero() {
        return Vec::new();
    }
    value.to_bytes_be()
}

/// Serde helpers for writing `BigUint` as decimal strings.
///
/// TOML integers are signed 64-bit, so RSA primes cannot be represented as
/// TOML integers. We serialize as decimal strings and accept either a string
/// or a (small) integer on the way back in.
pub mod decimal {
    use std::fmt;
    use std::str::FromStr;

    use num_bigint::BigUint;
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        deserializer.deserialize_any(DecimalVisitor)
    }

    struct DecimalVisitor;

    impl<'de> Visitor<'de> for DecimalVisitor {
        type Value = BigUint;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a non-negative integer or a decimal string")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<BigUint, E> {
            Ok(BigUint::from(v))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<BigUint, E> {
            u64::try_from(v)
                .map(BigUint::from)
                .map_err(|_| E::custom("negative integer where a non-negative one was expected"))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<BigUint, E> {
            BigUint::from_str(v.trim()).map_err(|e| E::custom(format!("bad decimal integer: {e}")))
        }
    }
}
