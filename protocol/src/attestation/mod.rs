//! # Attestation
//!
//! The two end-to-end flows and the types they hand back. See
//! [`Orchestrator`] for the flow diagrams.

pub mod error;
pub mod orchestrator;
pub mod outcome;

pub use error::AttestationError;
pub use orchestrator::Orchestrator;
pub use outcome::{AttestationOutcome, ConsensusOutcome, PersistInstruction};
