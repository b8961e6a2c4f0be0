// Copyright (c) 2026 ALAS Technology. MIT License.
// See LICENSE for details.

//! # StockProof Protocol — Core Library
//!
//! Multi-party attestation for replicated inventory records. A fixed roster
//! of inventory nodes vote on every record before it is written anywhere,
//! and jointly sign every answer handed to a requesting party.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the layers of the protocol,
//! leaf-first:
//!
//! - **crypto** — Bignum modular arithmetic, RSA keys, hashing in two explicit
//!   domains, sign/verify, encrypt/decrypt.
//! - **multisig** — Harn multisignature: partials, aggregation, sessions.
//! - **consensus** — The Proof-of-Authority commit gate.
//! - **inventory** — The record type and the cross-node consistency check.
//! - **roster** — Who takes part, with which identity, nonce and keys.
//! - **storage** — The store contract plus in-memory, JSON and sled stores.
//! - **attestation** — The orchestrator that composes the two flows.
//! - **config** — Protocol constants and the provisioning model.
//!
//! ## Design Philosophy
//!
//! 1. All arithmetic is exact. Keys run to hundreds of decimal digits.
//! 2. A rejected signature is an outcome, not an error.
//! 3. The core decides; the caller persists.
//! 4. Key material is injected, never global.

pub mod attestation;
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod inventory;
pub mod multisig;
pub mod roster;
pub mod storage;

pub use attestation::{AttestationError, AttestationOutcome, ConsensusOutcome, Orchestrator};
pub use config::AttestationConfig;
