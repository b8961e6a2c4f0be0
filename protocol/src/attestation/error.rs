use thiserror::Error;

use crate::config::ConfigError;
use crate::consensus::ConsensusError;
use crate::crypto::bignum::ArithmeticError;
use crate::crypto::encryption::EncryptionError;
use crate::crypto::keys::KeyError;
use crate::inventory::consistency::ConsistencyError;
use crate::inventory::record::RecordError;
use crate::multisig::MultisigError;
use crate::storage::StoreError;

/// Everything that can stop a single proposal or query.
///
/// None of these are fatal to the process. A rejected proposal and a failed
/// aggregate verification are outcomes, not errors, and never show up here.
#[derive(Debug, Error)]
pub enum AttestationError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{party} key derivation failed: {source}")]
    Key {
        party: &'static str,
        #[source]
        source: KeyError,
    },

    #[error("proposer {0} is not on the roster")]
    UnknownProposer(String),

    #[error("invalid record: {0}")]
    InvalidRecord(#[from] RecordError),

    #[error(transparent)]
    Arithmetic(#[from] ArithmeticError),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    #[error(transparent)]
    Consistency(#[from] ConsistencyError),

    #[error("multisignature error: {0}")]
    Multisig(#[from] MultisigError),

    #[error("encryption error: {0}")]
    Encryption(#[from] EncryptionError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AttestationError {
    /// `true` for the record-level failures of the query flow (missing or
    /// divergent record), which are reported before any cryptography runs.
    pub fn is_record_failure(&self) -> bool {
        matches!(
            self,
            Self::Consistency(
                ConsistencyError::RecordNotFound { .. } | ConsistencyError::RecordMismatch { .. }
            )
        )
    }
}
