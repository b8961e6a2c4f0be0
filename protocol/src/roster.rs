//! # Roster
//!
//! The fixed, ordered set of inventory nodes that take part in every
//! consensus round and every multisignature session, with each member's
//! derived RSA key pair.
//!
//! A `Roster` is built once from an [`AttestationConfig`] and never mutated.
//! Building it derives every member's key pair up front, so a bad `(p, q, e)`
//! triple fails at startup instead of in the middle of a vote.

use std::fmt;

use tracing::debug;

use crate::config::{AttestationConfig, ConfigError, MEMBER_LABEL_PREFIX};
use crate::crypto::keys::{generate_keypair, RsaKeypair, RsaPublicKey};
use crate::multisig::Participant;

/// A small positive integer identifying a participant in the Harn scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeIdentity(u64);

impl NodeIdentity {
    /// Returns `None` for zero, which would make `id^r mod n` degenerate.
    pub fn new(value: u64) -> Option<Self> {
        (value != 0).then_some(Self(value))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One roster member with derived keys.
#[derive(Debug, Clone)]
pub struct RosterMember {
    code: String,
    identity: NodeIdentity,
    nonce: u64,
    keypair: RsaKeypair,
}

impl RosterMember {
    pub fn code(&self) -> &str {
        &self.code
    }

    /// `"Inventory A"`.
    pub fn label(&self) -> String {
        format!("{MEMBER_LABEL_PREFIX}{}", self.code)
    }

    pub fn identity(&self) -> NodeIdentity {
        self.identity
    }

    pub fn nonce(&self) -> u64 {
        self.nonce
    }

    pub fn keypair(&self) -> &RsaKeypair {
        &self.keypair
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        self.keypair.public_key()
    }

    /// This member's `(identity, nonce)` pair for a multisignature session.
    pub fn participant(&self) -> Participant {
        Participant {
            identity: self.identity.get(),
            nonce: self.nonce,
        }
    }
}

/// The full, ordered roster plus the commit quorum.
#[derive(Debug, Clone)]
pub struct Roster {
    members: Vec<RosterMember>,
    quorum: usize,
}

impl Roster {
    /// Validates `config` and derives every member's key pair.
    pub fn from_config(config: &AttestationConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut members = Vec::with_capacity(config.members.len());
        for m in &config.members {
            let keypair = generate_keypair(&m.keys).map_err(|source| ConfigError::Key {
                member: m.label(),
                source,
            })?;
            let identity =
                NodeIdentity::new(m.identity).ok_or_else(|| ConfigError::ZeroIdentity(m.code.clone()))?;
            debug!(member = %m.code, identity = m.identity, "roster member keys derived");
            members.push(RosterMember {
                code: m.code.clone(),
                identity,
                nonce: m.nonce,
                keypair,
            });
        }

        Ok(Self {
            members,
            quorum: config.quorum,
        })
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RosterMember> {
        self.members.iter()
    }

    /// Looks up a member by code or label.
    pub fn get(&self, name: &str) -> Option<&RosterMember> {
        let code = name.strip_prefix(MEMBER_LABEL_PREFIX).unwrap_or(name);
        self.members.iter().find(|m| m.code == code)
    }

    /// The designated reference member for consistency checks: the first
    /// roster entry. Validation guarantees the roster is non-empty.
    pub fn reference(&self) -> &RosterMember {
        &self.members[0]
    }

    /// Every member's `(identity, nonce)`, in roster order.
    pub fn participants(&self) -> Vec<Participant> {
        self.members.iter().map(RosterMember::participant).collect()
    }

    pub fn codes(&self) -> Vec<&str> {
        self.members.iter().map(|m| m.code.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::keys::KeyError;
    use num_bigint::BigUint;

    #[test]
    fn test_demo_roster() {
        let roster = Roster::from_config(&AttestationConfig::demo()).unwrap();
        assert_eq!(roster.len(), 4);
        assert_eq!(roster.quorum(), 3);
        assert_eq!(roster.reference().code(), "A");
        assert_eq!(roster.get("Inventory C").unwrap().identity().get(), 128);
        assert_eq!(roster.get("D").unwrap().nonce(), 921);
        assert!(roster.get("E").is_none());
        assert_eq!(roster.codes(), vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn test_participants_in_roster_order() {
        let roster = Roster::from_config(&AttestationConfig::demo()).unwrap();
        let ids: Vec<u64> = roster.participants().iter().map(|p| p.identity).collect();
        assert_eq!(ids, vec![126, 127, 128, 129]);
    }

    #[test]
    fn test_bad_key_material_names_member() {
        let mut cfg = AttestationConfig::demo();
        cfg.members[1].keys.e = BigUint::from(2u8);
        let err = Roster::from_config(&cfg).unwrap_err();
        match err {
            ConfigError::Key { member, source } => {
                assert_eq!(member, "Inventory B");
                assert_eq!(source, KeyError::InvalidExponent);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_zero_identity_rejected() {
        assert!(NodeIdentity::new(0).is_none());
        assert_eq!(NodeIdentity::new(7).unwrap().get(), 7);
    }
}
