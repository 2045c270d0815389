//! Signed JSON objects
//!
//! An object is signed by serializing it with two-space indentation, in its
//! own key order, and attaching the Ed25519 signature of those bytes as a
//! `signature` field (`base64.sig.ed25519`). Verification strips the field,
//! re-serializes and checks the signature against the claimed author.
//!
//! With an [`HmacKey`] the signature covers the HMAC-SHA-512-256 tag of the
//! serialized bytes instead of the bytes themselves, so an object signed
//! under one network key does not verify under another or without one.
//!
//! Integral floats within the exact-integer range of an `f64` are written
//! without a fraction (`1.0` as `1`) so the bytes match what JavaScript
//! signers produce. Other floats are written by `serde_json` and may still
//! differ in exponent form (`1e21` rather than `1e+21`).

use std::fmt;
use std::str::FromStr;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::{Map, Number, Value};
use sha2::Sha512;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::crypto::{PublicKey, Signature};
use crate::keypair::Keypair;

/// Name of the field holding the signature
pub const SIGNATURE_FIELD: &str = "signature";
/// Size of an HMAC key in bytes
pub const HMAC_KEY_SIZE: usize = 32;
/// Size of the truncated HMAC-SHA-512 tag that gets signed
pub const HMAC_TAG_SIZE: usize = 32;

/// Largest integer an `f64` holds exactly
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

type HmacSha512 = Hmac<Sha512>;

#[derive(Debug, thiserror::Error)]
pub enum SignedError {
    #[error("only JSON objects can be signed")]
    NotAnObject,
    #[error("failed to serialize object: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("invalid hmac key: {0}")]
    HmacKey(String),
}

/// A 32-byte key mixed into signatures with HMAC-SHA-512-256
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct HmacKey([u8; HMAC_KEY_SIZE]);

impl From<[u8; HMAC_KEY_SIZE]> for HmacKey {
    fn from(bytes: [u8; HMAC_KEY_SIZE]) -> Self {
        HmacKey(bytes)
    }
}

impl HmacKey {
    pub fn from_slice(bytes: &[u8]) -> Result<Self, SignedError> {
        let bytes: [u8; HMAC_KEY_SIZE] = bytes.try_into().map_err(|_| {
            SignedError::HmacKey(format!(
                "expected {} bytes, got {}",
                HMAC_KEY_SIZE,
                bytes.len()
            ))
        })?;
        Ok(HmacKey(bytes))
    }

    /// HMAC-SHA-512 of `msg`, truncated to its first 32 bytes
    pub fn authenticate(&self, msg: &[u8]) -> Result<[u8; HMAC_TAG_SIZE], SignedError> {
        let mut mac = HmacSha512::new_from_slice(&self.0)
            .map_err(|e| SignedError::HmacKey(e.to_string()))?;
        mac.update(msg);
        let full = mac.finalize().into_bytes();

        let mut tag = [0u8; HMAC_TAG_SIZE];
        tag.copy_from_slice(&full[..HMAC_TAG_SIZE]);
        Ok(tag)
    }
}

/// Parses the standard base64 of the 32 key bytes.
impl FromStr for HmacKey {
    type Err = SignedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = STANDARD
            .decode(s.trim())
            .map_err(|e| SignedError::HmacKey(e.to_string()))?;
        let key = HmacKey::from_slice(&bytes);
        bytes.zeroize();
        key
    }
}

impl fmt::Debug for HmacKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HmacKey([REDACTED])")
    }
}

fn without_signature(map: &Map<String, Value>) -> Map<String, Value> {
    map.iter()
        .filter(|(key, _)| key.as_str() != SIGNATURE_FIELD)
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

fn normalize_number(n: Number) -> Number {
    match n.as_f64() {
        Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
            Number::from(f as i64)
        }
        _ => n,
    }
}

fn normalize_numbers(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::Number(normalize_number(n)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_numbers).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, normalize_numbers(value)))
                .collect(),
        ),
        other => other,
    }
}

fn signing_bytes(unsigned: Map<String, Value>) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_string_pretty(&normalize_numbers(Value::Object(unsigned)))
        .map(String::into_bytes)
}

fn signature_input(
    unsigned: Map<String, Value>,
    hmac_key: Option<&HmacKey>,
) -> Result<Vec<u8>, SignedError> {
    let bytes = signing_bytes(unsigned)?;
    match hmac_key {
        None => Ok(bytes),
        Some(key) => Ok(key.authenticate(&bytes)?.to_vec()),
    }
}

fn sign_with(
    keypair: &Keypair,
    hmac_key: Option<&HmacKey>,
    value: &Value,
) -> Result<Value, SignedError> {
    let map = value.as_object().ok_or(SignedError::NotAnObject)?;
    let mut unsigned = without_signature(map);
    let signature = keypair.sign(&signature_input(unsigned.clone(), hmac_key)?);
    unsigned.insert(
        SIGNATURE_FIELD.to_string(),
        Value::String(signature.to_string()),
    );
    Ok(Value::Object(unsigned))
}

fn verify_with(public: &PublicKey, hmac_key: Option<&HmacKey>, value: &Value) -> bool {
    let Some(map) = value.as_object() else {
        return false;
    };
    let Some(signature) = map
        .get(SIGNATURE_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<Signature>().ok())
    else {
        return false;
    };
    match signature_input(without_signature(map), hmac_key) {
        Ok(input) => public.verify(&input, &signature),
        Err(_) => false,
    }
}

/// Return a copy of `value` carrying a `signature` by `keypair`.
///
/// An existing `signature` field is replaced.
pub fn sign_object(keypair: &Keypair, value: &Value) -> Result<Value, SignedError> {
    sign_with(keypair, None, value)
}

/// [`sign_object`], signing the HMAC tag of the object under `hmac_key`
pub fn sign_object_with_hmac(
    keypair: &Keypair,
    hmac_key: &HmacKey,
    value: &Value,
) -> Result<Value, SignedError> {
    sign_with(keypair, Some(hmac_key), value)
}

/// Check the `signature` field of `value` against `public`.
///
/// Anything malformed (not an object, no signature, bad encoding) is simply
/// not a valid signature.
pub fn verify_object(public: &PublicKey, value: &Value) -> bool {
    verify_with(public, None, value)
}

/// [`verify_object`] for objects signed with [`sign_object_with_hmac`]
pub fn verify_object_with_hmac(public: &PublicKey, hmac_key: &HmacKey, value: &Value) -> bool {
    verify_with(public, Some(hmac_key), value)
}
