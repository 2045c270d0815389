//! # Keypairs
//!
//! A [`Keypair`] is a node's identity: an Ed25519 signing key, its public
//! half, and the curve they belong to. Its [`KeyRecord`] is the serialized
//! form stored in key files:
//!
//! ```json
//! {
//!   "curve": "ed25519",
//!   "public": "<base64>.ed25519",
//!   "private": "<base64 of seed || public>.ed25519",
//!   "id": "@<base64>.ed25519"
//! }
//! ```
//!
//! Records written by older tools may lack the `@` on `id`, or lack `curve`
//! or `id` entirely. [`Keypair::from_record`] accepts those and always
//! hands back a normalized keypair.

use std::fmt;
use std::str::FromStr;

use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};

use crate::crypto::{PublicKey, SecretKey, Signature, ED25519_TAG};
use crate::identifier::{get_tag, Identifier, Sigil};

#[derive(Debug, thiserror::Error)]
pub enum KeypairError {
    #[error("unsupported curve: {0}")]
    UnsupportedCurve(String),
    #[error("corrupt key record: {0}")]
    Corrupt(String),
}

/// The signing curves keybox can generate and load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Curve {
    #[default]
    Ed25519,
}

impl Curve {
    /// The tag suffix of keys on this curve
    pub fn tag(&self) -> &'static str {
        match self {
            Curve::Ed25519 => ED25519_TAG,
        }
    }
}

impl FromStr for Curve {
    type Err = KeypairError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ED25519_TAG => Ok(Curve::Ed25519),
            other => Err(KeypairError::UnsupportedCurve(other.to_string())),
        }
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// Serialized form of a [`Keypair`]
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<String>,
    pub public: String,
    pub private: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl fmt::Debug for KeyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyRecord")
            .field("curve", &self.curve)
            .field("public", &self.public)
            .field("private", &"[REDACTED]")
            .field("id", &self.id)
            .finish()
    }
}

/// A signing identity
#[derive(Debug, Clone)]
pub struct Keypair {
    curve: Curve,
    public: PublicKey,
    secret: SecretKey,
}

impl PartialEq for Keypair {
    fn eq(&self, other: &Self) -> bool {
        self.curve == other.curve && self.public == other.public
    }
}

impl Eq for Keypair {}

impl From<SecretKey> for Keypair {
    fn from(secret: SecretKey) -> Self {
        Self {
            curve: Curve::Ed25519,
            public: secret.public(),
            secret,
        }
    }
}

impl Keypair {
    /// Generate a fresh keypair on `curve` from `rng`
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(curve: Curve, rng: &mut R) -> Self {
        match curve {
            Curve::Ed25519 => Self::from(SecretKey::generate(rng)),
        }
    }

    pub fn curve(&self) -> Curve {
        self.curve
    }

    pub fn public(&self) -> &PublicKey {
        &self.public
    }

    pub fn secret(&self) -> &SecretKey {
        &self.secret
    }

    /// The feed id, `@` followed by the tagged public key
    pub fn id(&self) -> String {
        self.public.id()
    }

    pub fn sign(&self, msg: &[u8]) -> Signature {
        self.secret.sign(msg)
    }

    pub fn to_record(&self) -> KeyRecord {
        KeyRecord {
            curve: Some(self.curve.to_string()),
            public: self.public.to_string(),
            private: self.secret.to_tagged(),
            id: Some(self.id()),
        }
    }

    /// Validate and normalize a record
    ///
    /// - a missing `curve` is taken from the tag of `public`
    /// - a missing `id` is derived from `public`
    /// - an `id` without a sigil gets `@`
    ///
    /// # Errors
    ///
    /// [`KeypairError::UnsupportedCurve`] for unknown curves,
    /// [`KeypairError::Corrupt`] when keys do not decode, the private key does
    /// not belong to the public key, or `id` names a different key.
    pub fn from_record(record: &KeyRecord) -> Result<Self, KeypairError> {
        let curve = match &record.curve {
            Some(curve) => curve.parse::<Curve>()?,
            None => get_tag(&record.public)
                .ok_or_else(|| KeypairError::Corrupt("public key has no curve tag".to_string()))?
                .parse::<Curve>()?,
        };

        let public: PublicKey = record
            .public
            .parse()
            .map_err(|e| KeypairError::Corrupt(format!("public key: {}", e)))?;
        let secret: SecretKey = record
            .private
            .parse()
            .map_err(|e| KeypairError::Corrupt(format!("private key: {}", e)))?;
        if secret.public() != public {
            return Err(KeypairError::Corrupt(
                "private key does not match public key".to_string(),
            ));
        }

        if let Some(id) = &record.id {
            let id = normalize_id(id)?;
            if id.tag() != curve.tag() {
                return Err(KeypairError::Corrupt(format!(
                    "id tag `{}` does not match curve `{}`",
                    id.tag(),
                    curve
                )));
            }
            let body = id
                .decode_body()
                .map_err(|e| KeypairError::Corrupt(format!("id: {}", e)))?;
            if body != public.to_bytes() {
                return Err(KeypairError::Corrupt(
                    "id does not match public key".to_string(),
                ));
            }
        }

        Ok(Self {
            curve,
            public,
            secret,
        })
    }
}

/// Parse a stored id, adding the feed sigil when it is missing.
fn normalize_id(id: &str) -> Result<Identifier, KeypairError> {
    let id: Identifier = id
        .parse()
        .map_err(|e| KeypairError::Corrupt(format!("id: {}", e)))?;
    match id.sigil() {
        None => Ok(id.with_sigil(Sigil::Feed)),
        Some(Sigil::Feed) => Ok(id),
        Some(other) => Err(KeypairError::Corrupt(format!(
            "id has sigil `{}`, expected `{}`",
            other,
            Sigil::Feed
        ))),
    }
}

/// Generate a keypair from the thread RNG
///
/// `None` selects the default curve.
///
/// # Errors
///
/// Returns [`KeypairError::UnsupportedCurve`] for a curve name other than
/// `ed25519`.
pub fn generate(curve: Option<&str>) -> Result<Keypair, KeypairError> {
    let curve = match curve {
        Some(name) => name.parse()?,
        None => Curve::default(),
    };
    Ok(Keypair::generate(curve, &mut rand::rng()))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_generate_id() {
        let keys = generate(Some("ed25519")).unwrap();
        assert!(keys.id().starts_with('@'));
        assert_eq!(get_tag(&keys.id()), Some("ed25519"));
        assert_eq!(keys.curve(), Curve::Ed25519);

        let default = generate(None).unwrap();
        assert_eq!(default.curve(), Curve::Ed25519);
        assert_ne!(default.id(), keys.id());
    }

    #[test]
    fn test_unsupported_curve() {
        let err = generate(Some("secp256k1")).unwrap_err();
        assert!(matches!(err, KeypairError::UnsupportedCurve(ref c) if c == "secp256k1"));
    }

    #[test]
    fn test_record_roundtrip() {
        let keys = generate(None).unwrap();
        let record = keys.to_record();
        assert_eq!(record.curve.as_deref(), Some("ed25519"));
        assert_eq!(record.id.as_deref(), Some(keys.id().as_str()));
        assert!(record.public.ends_with(".ed25519"));
        assert!(record.private.ends_with(".ed25519"));

        let loaded = Keypair::from_record(&record).unwrap();
        assert_eq!(loaded, keys);
        assert_eq!(loaded.to_record(), record);

        let json = serde_json::to_string(&record).unwrap();
        let decoded: KeyRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_record_without_sigil_is_normalized() {
        let keys = generate(None).unwrap();
        let mut record = keys.to_record();
        let stored = keys.id()[1..].to_string();
        record.id = Some(stored.clone());

        let loaded = Keypair::from_record(&record).unwrap();
        assert_eq!(loaded.id(), format!("@{}", stored));
    }

    #[test]
    fn test_record_legacy_fields_missing() {
        let keys = generate(None).unwrap();
        let mut record = keys.to_record();
        record.curve = None;
        record.id = None;

        let loaded = Keypair::from_record(&record).unwrap();
        assert_eq!(loaded.id(), keys.id());
    }

    #[test]
    fn test_record_mismatched_keys_are_corrupt() {
        let a = generate(None).unwrap().to_record();
        let b = generate(None).unwrap().to_record();

        let mut swapped = a.clone();
        swapped.private = b.private.clone();
        assert!(matches!(
            Keypair::from_record(&swapped),
            Err(KeypairError::Corrupt(_))
        ));

        let mut wrong_id = a.clone();
        wrong_id.id = b.id.clone();
        assert!(matches!(
            Keypair::from_record(&wrong_id),
            Err(KeypairError::Corrupt(_))
        ));

        let mut wrong_sigil = a.clone();
        wrong_sigil.id = a.id.as_ref().map(|id| id.replacen('@', "%", 1));
        assert!(matches!(
            Keypair::from_record(&wrong_sigil),
            Err(KeypairError::Corrupt(_))
        ));

        let mut garbage = a;
        garbage.public = "not a key".to_string();
        assert!(Keypair::from_record(&garbage).is_err());
    }

    #[test]
    fn test_record_unknown_curve() {
        let mut record = generate(None).unwrap().to_record();
        record.curve = Some("curve448".to_string());
        assert!(matches!(
            Keypair::from_record(&record),
            Err(KeypairError::UnsupportedCurve(_))
        ));
    }

    #[test]
    fn test_record_debug_redacts_private() {
        let record = generate(None).unwrap().to_record();
        let debug = format!("{:?}", record);
        assert!(!debug.contains(&record.private));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn test_sign_with_keypair() {
        let keys = generate(None).unwrap();
        let signature = keys.sign(b"msg");
        assert!(keys.public().verify(b"msg", &signature));
    }
}
