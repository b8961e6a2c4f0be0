//! # Protocol Configuration & Constants
//!
//! Every magic number lives here, along with the provisioning model: who is
//! on the roster, what key material each node holds, and how many votes a
//! commit needs.
//!
//! Nothing in the core reads process-wide key tables. An
//! [`AttestationConfig`] is loaded once by the caller and injected into the
//! [`Orchestrator`](crate::attestation::Orchestrator).
//!
//! ## File formats
//!
//! - TOML (`config.toml`), the native format. Big integers are decimal
//!   strings because TOML integers stop at 64 bits.
//! - The legacy sectioned `parameters.txt`, applied as an overlay with
//!   [`AttestationConfig::apply_parameters`]:
//!
//! ```text
//! [Identities]
//! Inventory A,126
//! [RandomValues]
//! Inventory A,621
//! [PKGKeys]
//! p,1004162036461488639338597000466705179253226703
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::hash::HashDomain;
use crate::crypto::keys::{KeyError, KeyMaterial};

// ---------------------------------------------------------------------------
// Protocol Constants
// ---------------------------------------------------------------------------

/// Crate protocol version, reported by the node binary.
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Minimum accepting votes for a commit on the four-node roster.
pub const DEFAULT_QUORUM: usize = 3;

/// How long the async fan-out waits for a single vote before counting it
/// as not received.
pub const DEFAULT_VOTE_TIMEOUT_MS: u64 = 2_000;

/// Separator between a message and its identity salt: `"{msg}::{id}"`.
pub const PARTIAL_SALT_SEPARATOR: &str = "::";

/// Leading MD5 bytes kept by the 64-bit hash domain.
pub const MD5_TRUNCATED_BYTES: usize = 8;

/// Hash domain of the record-commit flow (proposer signature, peer votes).
pub const COMMIT_HASH_DOMAIN: HashDomain = HashDomain::Md5Trunc64;

/// Hash domain of the query-attestation flow (Harn partials).
pub const QUERY_HASH_DOMAIN: HashDomain = HashDomain::Sha256Full;

/// Prefix used when rendering a member code as a human label.
pub const MEMBER_LABEL_PREFIX: &str = "Inventory ";

/// Default file name of the node configuration inside a data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed TOML configuration: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("failed to render TOML configuration: {0}")]
    TomlRender(#[from] toml::ser::Error),

    #[error("parameters line {line}: {reason}")]
    Parameters { line: usize, reason: String },

    #[error("roster is empty")]
    EmptyRoster,

    #[error("duplicate roster member code: {0}")]
    DuplicateMember(String),

    #[error("duplicate node identity {0}")]
    DuplicateIdentity(u64),

    #[error("node identity for member {0} must be non-zero")]
    ZeroIdentity(String),

    #[error("quorum {quorum} is invalid for a roster of {roster}")]
    InvalidQuorum { quorum: usize, roster: usize },

    #[error("unknown roster member: {0}")]
    UnknownMember(String),

    #[error("key material for {member} is unusable: {source}")]
    Key {
        member: String,
        #[source]
        source: KeyError,
    },
}

// ---------------------------------------------------------------------------
// Configuration Model
// ---------------------------------------------------------------------------

/// One provisioned inventory node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberConfig {
    /// Short code, e.g. `"A"`. Also the store key and the location stamped on
    /// records this member appends.
    pub code: String,
    /// Public Harn identity. Must be non-zero and unique.
    pub identity: u64,
    /// Harn nonce `r_i`. See the note on nonce reuse in [`crate::multisig`].
    pub nonce: u64,
    /// The member's own RSA key material, used to sign record proposals.
    pub keys: KeyMaterial,
}

impl MemberConfig {
    /// `"Inventory A"` style label.
    pub fn label(&self) -> String {
        format!("{MEMBER_LABEL_PREFIX}{}", self.code)
    }
}

fn default_quorum() -> usize {
    DEFAULT_QUORUM
}

fn default_vote_timeout_ms() -> u64 {
    DEFAULT_VOTE_TIMEOUT_MS
}

/// Complete provisioning for one attestation deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationConfig {
    /// Minimum accepting votes (proposer included) to commit a record.
    #[serde(default = "default_quorum")]
    pub quorum: usize,
    /// Per-vote timeout for the async fan-out, in milliseconds.
    #[serde(default = "default_vote_timeout_ms")]
    pub vote_timeout_ms: u64,
    /// Shared PKG key material. Its modulus hosts every partial signature.
    pub pkg: KeyMaterial,
    /// The requesting party's key material (procurement officer).
    pub requestor: KeyMaterial,
    /// Ordered roster. The first member is the consistency reference.
    pub members: Vec<MemberConfig>,
}

/// Demo key material as decimal `(p, q, e)`: PKG, requestor, then members A to D.
const DEMO_KEYS: [[&str; 3]; 6] = [
    [
        "1004162036461488639338597000466705179253226703",
        "950133741151267522116252385927940618264103623",
        "973028207197278907211",
    ],
    [
        "1080954735722463992988394149602856332100628417",
        "1158106283320086444890911863299879973542293243",
        "106506253943651610547613",
    ],
    [
        "1210613765735147311106936311866593978079938707",
        "1247842850282035753615951347964437248190231863",
        "815459040813953176289801",
    ],
    [
        "787435686772982288169641922308628444877260947",
        "1325305233886096053310340418467385397239375379",
        "692450682143089563609787",
    ],
    [
        "1014247300991039444864201518275018240361205111",
        "904030450302158058469475048755214591704639633",
        "1158749422015035388438057",
    ],
    [
        "1287737200891425621338551020762858710281638317",
        "1330909125725073469794953234151525201084537607",
        "33981230465225879849295979",
    ],
];

/// Demo roster as `(code, identity, nonce)`, in the order of `DEMO_KEYS[2..]`.
const DEMO_MEMBERS: [(&str, u64, u64); 4] = [
    ("A", 126, 621),
    ("B", 127, 721),
    ("C", 128, 821),
    ("D", 129, 921),
];

fn demo_keys(index: usize) -> KeyMaterial {
    let [p, q, e] = DEMO_KEYS[index];
    // Invariant: every DEMO_KEYS entry is a plain ASCII decimal literal.
    KeyMaterial::from_decimal(p, q, e).expect("DEMO_KEYS entries are decimal literals")
}

impl AttestationConfig {
    /// The four-node demonstration deployment.
    pub fn demo() -> Self {
        let members = DEMO_MEMBERS
            .iter()
            .enumerate()
            .map(|(i, &(code, identity, nonce))| MemberConfig {
                code: code.to_string(),
                identity,
                nonce,
                keys: demo_keys(i + 2),
            })
            .collect();

        Self {
            quorum: DEFAULT_QUORUM,
            vote_timeout_ms: DEFAULT_VOTE_TIMEOUT_MS,
            pkg: demo_keys(0),
            requestor: demo_keys(1),
            members,
        }
    }

    /// Parses a TOML document and validates it.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Looks up a member by code (`"A"`) or label (`"Inventory A"`).
    pub fn member(&self, name: &str) -> Option<&MemberConfig> {
        let code = name.strip_prefix(MEMBER_LABEL_PREFIX).unwrap_or(name);
        self.members.iter().find(|m| m.code == code)
    }

    fn member_mut(&mut self, name: &str) -> Option<&mut MemberConfig> {
        let code = name.strip_prefix(MEMBER_LABEL_PREFIX).unwrap_or(name);
        self.members.iter_mut().find(|m| m.code == code)
    }

    /// Checks roster shape and quorum. Key material is checked later, when
    /// the roster derives key pairs.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.members.is_empty() {
            return Err(ConfigError::EmptyRoster);
        }

        let mut codes = HashSet::new();
        let mut identities = HashSet::new();
        for m in &self.members {
            if !codes.insert(m.code.as_str()) {
                return Err(ConfigError::DuplicateMember(m.code.clone()));
            }
            if m.identity == 0 {
                return Err(ConfigError::ZeroIdentity(m.code.clone()));
            }
            if !identities.insert(m.identity) {
                return Err(ConfigError::DuplicateIdentity(m.identity));
            }
        }

        if self.quorum == 0 || self.quorum > self.members.len() {
            return Err(ConfigError::InvalidQuorum {
                quorum: self.quorum,
                roster: self.members.len(),
            });
        }
        Ok(())
    }

    /// Overlays values from a legacy `parameters.txt` document.
    ///
    /// Identities and nonces must name existing members. Key sections may
    /// set any subset of `p`, `q`, `e`. The overlay is all-or-nothing: on any
    /// parse or validation error `self` is left untouched.
    pub fn apply_parameters(&mut self, text: &str) -> Result<(), ConfigError> {
        let mut next = self.clone();
        let mut section: Option<String> = None;

        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                section = Some(name.trim().to_string());
                continue;
            }

            let bad = |reason: String| ConfigError::Parameters {
                line: line_no,
                reason,
            };
            let (key, value) = line
                .split_once(',')
                .ok_or_else(|| bad("expected `key,value`".to_string()))?;
            let (key, value) = (key.trim(), value.trim());

            match section.as_deref() {
                Some("Identities") | Some("RandomValues") => {
                    let parsed = u64::from_str(value)
                        .map_err(|e| bad(format!("bad integer {value:?}: {e}")))?;
                    let is_identity = section.as_deref() == Some("Identities");
                    let member = next
                        .member_mut(key)
                        .ok_or_else(|| ConfigError::UnknownMember(key.to_string()))?;
                    if is_identity {
                        member.identity = parsed;
                    } else {
                        member.nonce = parsed;
                    }
                }
                Some("PKGKeys") | Some("ProcurementKeys") => {
                    let parsed = BigUint::from_str(value)
                        .map_err(|e| bad(format!("bad integer {value:?}: {e}")))?;
                    let target = if section.as_deref() == Some("PKGKeys") {
                        &mut next.pkg
                    } else {
                        &mut next.requestor
                    };
                    match key {
                        "p" => target.p = parsed,
                        "q" => target.q = parsed,
                        "e" => target.e = parsed,
                        other => return Err(bad(format!("unknown key component {other:?}"))),
                    }
                }
                Some(other) => return Err(bad(format!("unknown section [{other}]"))),
                None => return Err(bad("value outside of any section".to_string())),
            }
        }

        next.validate()?;
        *self = next;
        Ok(())
    }

    /// Reads a `parameters.txt` file and applies it.
    pub fn apply_parameters_file(&mut self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.apply_parameters(&text)
    }
}
