//! Aggregation and verification of partial signatures.

use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::partial::{partial_term, PartialSignature};
use super::{MultisigError, Statement};
use crate::crypto::bignum;
use crate::crypto::hash::HashDomain;

/// The combined signature plus the identities that contributed to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateSignature {
    #[serde(with = "bignum::decimal")]
    value: BigUint,
    signers: Vec<u64>,
}

impl AggregateSignature {
    pub fn from_parts(value: BigUint, signers: Vec<u64>) -> Self {
        Self { value, signers }
    }

    pub fn value(&self) -> &BigUint {
        &self.value
    }

    /// Contributing identities in the order their partials were summed.
    pub fn signers(&self) -> &[u64] {
        &self.signers
    }
}

impl std::fmt::Display for AggregateSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// `sum(partials) mod n`. Order-independent.
pub fn aggregate(
    partials: &[PartialSignature],
    modulus: &BigUint,
) -> Result<AggregateSignature, MultisigError> {
    if modulus.is_zero() {
        return Err(MultisigError::NonPositiveModulus);
    }

    let value = partials
        .iter()
        .fold(BigUint::zero(), |acc, p| (acc + p.value()) % modulus);
    let signers = partials.iter().map(PartialSignature::identity).collect();

    Ok(AggregateSignature { value, signers })
}

/// Recomputes the expected aggregate from the public statements and compares.
///
/// Returns `Ok(false)` on mismatch. Errors only on a degenerate modulus or a
/// zero identity in `statements`.
pub fn verify_aggregate(
    aggregate: &AggregateSignature,
    statements: &[Statement],
    modulus: &BigUint,
    domain: HashDomain,
) -> Result<bool, MultisigError> {
    if modulus.is_zero() {
        return Err(MultisigError::NonPositiveModulus);
    }

    let mut expected = BigUint::zero();
    for s in statements {
        let term = partial_term(&s.participant, &s.message, modulus, domain)?;
        expected = (expected + term) % modulus;
    }

    let ok = &expected == aggregate.value();
    debug!(
        statements = statements.len(),
        verified = ok,
        "multisignature aggregate checked"
    );
    Ok(ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AttestationConfig;
    use crate::crypto::keys::generate_keypair;
    use crate::multisig::{generate_partial, Participant};

    fn pkg_n() -> BigUint {
        generate_keypair(&AttestationConfig::demo().pkg)
            .unwrap()
            .modulus()
            .clone()
    }

    fn demo_statements(message: &str) -> Vec<Statement> {
        [(126, 621), (127, 721), (128, 821), (129, 921)]
            .into_iter()
            .map(|(identity, nonce)| Statement::new(Participant { identity, nonce }, message))
            .collect()
    }

    fn partials_for(statements: &[Statement], n: &BigUint) -> Vec<PartialSignature> {
        statements
            .iter()
            .map(|s| generate_partial(&s.participant, &s.message, n, HashDomain::Sha256Full).unwrap())
            .collect()
    }

    #[test]
    fn test_demo_aggregate_known_answer() {
        let n = pkg_n();
        let statements = demo_statements("Item: 001, QTY: 32, Location: D");
        let agg = aggregate(&partials_for(&statements, &n), &n).unwrap();
        let expected = BigUint::parse_bytes(
            b"756117678570418895122518954672969503419040241833203249302519956579165131409007943512966905",
            10,
        )
        .unwrap();
        assert_eq!(agg.value(), &expected);
        assert_eq!(agg.signers(), &[126, 127, 128, 129]);
        assert!(verify_aggregate(&agg, &statements, &n, HashDomain::Sha256Full).unwrap());
    }

    #[test]
    fn test_aggregate_is_order_independent() {
        let n = pkg_n();
        let statements = demo_statements("Item: 002, QTY: 20, Location: C");
        let mut partials = partials_for(&statements, &n);
        let forward = aggregate(&partials, &n).unwrap();
        partials.reverse();
        let backward = aggregate(&partials, &n).unwrap();
        assert_eq!(forward.value(), backward.value());
    }

    #[test]
    fn test_tampered_partial_fails_verification() {
        let n = pkg_n();
        let statements = demo_statements("Item: 003, QTY: 22, Location: B");
        let mut partials = partials_for(&statements, &n);
        let bumped = (partials[2].value() + 1u32) % &n;
        partials[2] = PartialSignature::from_parts(partials[2].identity(), bumped);
        let agg = aggregate(&partials, &n).unwrap();
        assert!(!verify_aggregate(&agg, &statements, &n, HashDomain::Sha256Full).unwrap());
    }

    #[test]
    fn test_divergent_messages_verify_against_their_own_statements() {
        let n = pkg_n();
        let mut statements = demo_statements("Item: 004, QTY: 12, Location: A");
        statements[3].message = "Item: 004, QTY: 13, Location: A".to_string();
        let agg = aggregate(&partials_for(&statements, &n), &n).unwrap();
        assert!(verify_aggregate(&agg, &statements, &n, HashDomain::Sha256Full).unwrap());

        // Checking the same aggregate against a uniform message set fails.
        let uniform = demo_statements("Item: 004, QTY: 12, Location: A");
        assert!(!verify_aggregate(&agg, &uniform, &n, HashDomain::Sha256Full).unwrap());
    }

    #[test]
    fn test_wrong_domain_fails_verification() {
        let n = pkg_n();
        let statements = demo_statements("Item: 001, QTY: 32, Location: D");
        let agg = aggregate(&partials_for(&statements, &n), &n).unwrap();
        assert!(!verify_aggregate(&agg, &statements, &n, HashDomain::Md5Trunc64).unwrap());
    }

    #[test]
    fn test_missing_participant_fails_verification() {
        let n = pkg_n();
        let statements = demo_statements("Item: 001, QTY: 32, Location: D");
        let partials = partials_for(&statements[..3], &n);
        let agg = aggregate(&partials, &n).unwrap();
        assert!(!verify_aggregate(&agg, &statements, &n, HashDomain::Sha256Full).unwrap());
    }

    #[test]
    fn test_degenerate_modulus() {
        let agg = AggregateSignature::from_parts(BigUint::zero(), vec![]);
        assert_eq!(
            aggregate(&[], &BigUint::zero()).unwrap_err(),
            MultisigError::NonPositiveModulus
        );
        assert_eq!(
            verify_aggregate(&agg, &[], &BigUint::zero(), HashDomain::Sha256Full).unwrap_err(),
            MultisigError::NonPositiveModulus
        );
    }

    #[test]
    fn test_zero_identity_in_statements_fails_fast() {
        let n = pkg_n();
        let agg = AggregateSignature::from_parts(BigUint::zero(), vec![]);
        let bad = vec![Statement::new(
            Participant {
                identity: 0,
                nonce: 1,
            },
            "m",
        )];
        assert_eq!(
            verify_aggregate(&agg, &bad, &n, HashDomain::Sha256Full).unwrap_err(),
            MultisigError::ZeroIdentity
        );
    }
}
