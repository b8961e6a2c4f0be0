//! # Multisignature Session
//!
//! Ephemeral state for one query: the per-node statements, their partial
//! signatures, and (once finalized) the aggregate. A session is created per
//! query and dropped when the verification result has been returned.
//!
//! ```text
//! new() ──► contribute() × n ──► finalize() ──► verify()
//! ```

use num_bigint::BigUint;
use num_traits::Zero;
use tracing::debug;
use uuid::Uuid;

use super::aggregate::{aggregate, verify_aggregate, AggregateSignature};
use super::partial::{generate_partial, PartialSignature};
use super::{MultisigError, Participant, Statement};
use crate::crypto::hash::HashDomain;

#[cfg(test)]
thread_local! {
    /// Sessions opened on the current thread.
    pub(crate) static SESSIONS_OPENED: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
}

#[derive(Debug, Clone)]
pub struct MultisigSession {
    id: Uuid,
    modulus: BigUint,
    domain: HashDomain,
    statements: Vec<Statement>,
    partials: Vec<PartialSignature>,
    aggregate: Option<AggregateSignature>,
}

impl MultisigSession {
    /// Opens a session over `modulus`, hashing partials under `domain`.
    pub fn new(modulus: BigUint, domain: HashDomain) -> Result<Self, MultisigError> {
        if modulus.is_zero() {
            return Err(MultisigError::NonPositiveModulus);
        }
        #[cfg(test)]
        SESSIONS_OPENED.with(|n| n.set(n.get() + 1));
        Ok(Self {
            id: Uuid::new_v4(),
            modulus,
            domain,
            statements: Vec::new(),
            partials: Vec::new(),
            aggregate: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn domain(&self) -> HashDomain {
        self.domain
    }

    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    pub fn partials(&self) -> &[PartialSignature] {
        &self.partials
    }

    pub fn aggregate(&self) -> Option<&AggregateSignature> {
        self.aggregate.as_ref()
    }

    /// Records `participant`'s statement and generates its partial.
    pub fn contribute(
        &mut self,
        participant: Participant,
        message: impl Into<String>,
    ) -> Result<&PartialSignature, MultisigError> {
        if self.aggregate.is_some() {
            return Err(MultisigError::AlreadyFinalized);
        }

        let message = message.into();
        let partial = generate_partial(&participant, &message, &self.modulus, self.domain)?;
        debug!(
            session = %self.id,
            identity = participant.identity,
            "partial signature generated"
        );

        self.statements.push(Statement::new(participant, message));
        self.partials.push(partial);
        Ok(&self.partials[self.partials.len() - 1])
    }

    /// Combines all partials. May be called once.
    pub fn finalize(&mut self) -> Result<&AggregateSignature, MultisigError> {
        if self.aggregate.is_some() {
            return Err(MultisigError::AlreadyFinalized);
        }
        if self.partials.is_empty() {
            return Err(MultisigError::EmptySession);
        }

        let combined = aggregate(&self.partials, &self.modulus)?;
        Ok(self.aggregate.insert(combined))
    }

    /// Verifies the aggregate against the session's own statements.
    ///
    /// An unfinalized session verifies as `false`.
    pub fn verify(&self) -> Result<bool, MultisigError> {
        match &self.aggregate {
            Some(agg) => verify_aggregate(agg, &self.statements, &self.modulus, self.domain),
            None => Ok(false),
        }
    }
}
