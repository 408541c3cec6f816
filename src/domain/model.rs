use crate::foundation::{Dominion, EthAddress, Point, Result, TillerError};
use secp256k1::{Message, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical, backend-agnostic snapshot of a point. Produced fresh on every
/// query; never cached across calls because chain state may change between
/// reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PointInfo {
    pub point: Point,
    pub dominion: Dominion,
    pub owner: Option<EthAddress>,
    pub spawn_proxy: Option<EthAddress>,
    pub management_proxy: Option<EthAddress>,
    pub transfer_proxy: Option<EthAddress>,
    /// Present only when the backend's explicit has-sponsor flag is set;
    /// never inferred from the sponsor number alone.
    pub sponsor: Option<Point>,
    /// Currently configured network keys, absent when the point has never
    /// been keyed.
    pub keys: Option<ConfiguredKeys>,
    /// Network-key revision ("life").
    pub life: u64,
    /// Continuity number ("rift").
    pub rift: u64,
    pub spawn_count: u64,
}

/// Public key material currently configured on a backend.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfiguredKeys {
    pub crypt: String,
    pub auth: String,
    pub suite: u32,
}

impl ConfiguredKeys {
    /// Compares against target public keys, tolerating `0x` prefixes and
    /// case differences in the hex encodings.
    pub fn matches(&self, crypt_public: &str, auth_public: &str) -> bool {
        normalize_hex(&self.crypt) == normalize_hex(crypt_public) && normalize_hex(&self.auth) == normalize_hex(auth_public)
    }
}

pub fn normalize_hex(value: &str) -> String {
    value.trim().strip_prefix("0x").unwrap_or(value.trim()).to_lowercase()
}

/// One half of a network keypair, hex-encoded.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyHalf {
    pub public: String,
    pub private: String,
}

/// An encryption keypair and an authentication keypair, tagged with the
/// revision and continuity they were generated for. Immutable once persisted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkKeyPair {
    pub crypt: KeyHalf,
    pub auth: KeyHalf,
    pub life: u64,
    pub rift: u64,
}

/// Deterministic boot artifact derived from `(NetworkKeyPair, Point, life)`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyFile {
    pub point: Point,
    pub life: u64,
    pub contents: String,
}

/// Outcome of a backend authority query.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthorityCheck {
    pub allowed: bool,
    pub reason: Option<String>,
}

impl AuthorityCheck {
    pub fn allowed() -> Self {
        Self { allowed: true, reason: None }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        Self { allowed: false, reason: Some(reason.into()) }
    }
}

/// Backend-specific submission receipt, opaque beyond success and identity.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "dominion", rename_all = "lowercase")]
pub enum Receipt {
    L1 { tx_hash: String, gas_gwei: u64 },
    L2 { tx_hash: String, nonce: u64 },
}

impl Receipt {
    pub fn dominion(&self) -> Dominion {
        match self {
            Receipt::L1 { .. } => Dominion::L1,
            Receipt::L2 { .. } => Dominion::L2,
        }
    }

    pub fn tx_hash(&self) -> &str {
        match self {
            Receipt::L1 { tx_hash, .. } | Receipt::L2 { tx_hash, .. } => tx_hash,
        }
    }
}

/// A submitted configure-keys mutation, with the revision and continuity it
/// was submitted for.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmittedConfiguration {
    pub receipt: Receipt,
    pub life: u64,
    pub rift: u64,
}

/// Result of a dispatch decision. Authorization failures are values, not
/// fatal errors, so batch processing continues to the next point.
#[derive(Clone, Debug)]
pub enum ConfigureOutcome {
    Submitted(SubmittedConfiguration),
    /// The backend already holds the target public keys and no breach was
    /// requested; zero submissions were made.
    AlreadyConfigured,
    NotAuthorized { reason: String },
}

/// Per-point result of a breach.
#[derive(Clone, Debug)]
pub struct BreachOutcome {
    pub point: Point,
    pub info: PointInfo,
    pub keys: NetworkKeyPair,
    pub keyfile: KeyFile,
    pub configuration: SubmittedConfiguration,
}

/// Batch-level result: successes and per-point failures, never a throw on
/// the first failing point.
#[derive(Debug, Default)]
pub struct BatchReport<T> {
    pub successes: Vec<T>,
    pub failures: Vec<PointFailure>,
}

#[derive(Debug)]
pub struct PointFailure {
    pub point: Point,
    pub error: TillerError,
}

impl<T> BatchReport<T> {
    pub fn new() -> Self {
        Self { successes: Vec::new(), failures: Vec::new() }
    }

    pub fn record_success(&mut self, outcome: T) {
        self.successes.push(outcome);
    }

    pub fn record_failure(&mut self, point: Point, error: TillerError) {
        self.failures.push(PointFailure { point, error });
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty()
    }
}

/// The identity that signs mutations: an L1 account address plus its secret
/// key. Address derivation from the key is delegated to wallet tooling, so
/// both halves are supplied by the caller.
#[derive(Clone)]
pub struct SigningIdentity {
    pub address: EthAddress,
    secret: [u8; 32],
}

impl SigningIdentity {
    pub fn from_parts(address: EthAddress, secret_hex: &str) -> Result<Self> {
        let bytes = hex::decode(normalize_hex(secret_hex))?;
        let secret: [u8; 32] = bytes.try_into().map_err(|_| {
            TillerError::CryptoError { operation: "load signing key".to_string(), details: "secret key is not 32 bytes".to_string() }
        })?;
        // Reject keys outside the curve order up front.
        SecretKey::from_slice(&secret)?;
        Ok(Self { address, secret })
    }

    /// ECDSA signature over a 32-byte digest, compact hex.
    pub fn sign_digest(&self, digest: [u8; 32]) -> Result<String> {
        let secp = Secp256k1::signing_only();
        let key = SecretKey::from_slice(&self.secret)?;
        let signature = secp.sign_ecdsa(&Message::from_digest(digest), &key);
        Ok(hex::encode(signature.serialize_compact()))
    }
}

impl fmt::Debug for SigningIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningIdentity").field("address", &self.address).finish_non_exhaustive()
    }
}
