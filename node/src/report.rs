//! Plain-text rendering of keys, outcomes and inventories on stdout.

use anyhow::Result;

use stockproof_protocol::attestation::{AttestationOutcome, ConsensusOutcome, Orchestrator};
use stockproof_protocol::crypto::keys::RsaKeypair;
use stockproof_protocol::storage::RecordStore;

fn print_keypair(label: &str, kp: &RsaKeypair) {
    println!("{label}");
    println!("  Public key  (e, n) : {}", kp.public_key());
    println!(
        "  Private key (d, n) : ({}, {})",
        kp.private_key().d(),
        kp.private_key().n()
    );
}

/// Every member's key pair, then the PKG and the requestor.
pub fn print_keys(orch: &Orchestrator) {
    for member in orch.roster().iter() {
        print_keypair(&member.label(), member.keypair());
        println!("  Identity / nonce   : {} / {}", member.identity(), member.nonce());
    }
    print_keypair("PKG", orch.pkg_keypair());
    print_keypair("Requestor", orch.requestor_keypair());
}

pub fn print_consensus(outcome: &ConsensusOutcome) {
    println!("Round {}", outcome.round_id);
    println!("  Proposer  : {}", outcome.proposer);
    println!(
        "  Record    : {},{},{} @ {}",
        outcome.record.id, outcome.record.qty, outcome.record.price, outcome.record.location
    );
    println!("  Signature : {}", outcome.signature);
    for vote in &outcome.votes {
        let note = if vote.implicit { " (proposer)" } else { "" };
        println!("    {:<3} {}{}", vote.member, vote.decision, note);
    }
    println!(
        "  Decision  : {} ({} of {} needed)",
        if outcome.committed { "committed" } else { "rejected" },
        outcome.vote_count,
        outcome.quorum
    );
}

pub fn print_attestation(outcome: &AttestationOutcome) {
    println!("Session {}", outcome.session_id);
    for (statement, partial) in outcome.statements.iter().zip(&outcome.partials) {
        println!(
            "  id {:<5} {:<40} partial {}",
            partial.identity(),
            statement.message,
            partial.value()
        );
    }
    println!("  Aggregate  : {}", outcome.aggregate_signature);
    println!("  Verified   : {}", outcome.verified);
    println!("  Ciphertext : {}", outcome.ciphertext);
    match &outcome.recovered_plaintext {
        Some(text) => println!("  Plaintext  : {text}"),
        None => println!("  Plaintext  : (requestor key not held)"),
    }
}

pub fn print_inventory(orch: &Orchestrator, store: &dyn RecordStore) -> Result<()> {
    for member in orch.roster().iter() {
        println!("{}", member.label());
        for r in store.list(member.code())? {
            println!(
                "  {:<6} QTY {:>6}  Price {:>6}  Location {}",
                r.id, r.qty, r.price, r.location
            );
        }
    }
    Ok(())
}
