use std::fmt;
use std::str::FromStr;

use curve25519_dalek::edwards::CompressedEdwardsY;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use crate::identifier::{decode_tagged, encode_tagged, Identifier, IdentifierError, Sigil};

/// Size of Ed25519 private key seed in bytes
pub const PRIVATE_KEY_SIZE: usize = 32;
/// Size of Ed25519 public key in bytes
pub const PUBLIC_KEY_SIZE: usize = 32;
/// Size of the serialized private key (`seed || public`) in bytes
pub const KEYPAIR_SIZE: usize = PRIVATE_KEY_SIZE + PUBLIC_KEY_SIZE;
/// Size of an Ed25519 signature in bytes
pub const SIGNATURE_SIZE: usize = 64;

/// Tag appended to Ed25519 keys
pub const ED25519_TAG: &str = "ed25519";
/// Tag appended to Ed25519 signatures
pub const SIGNATURE_TAG: &str = "sig.ed25519";

/// Errors that can occur during key operations
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key error: {0}")]
    Default(#[from] anyhow::Error),
    #[error("key encoding error: {0}")]
    Encoding(#[from] IdentifierError),
}

/// Public key for identity and envelope recipients
///
/// Wraps an Ed25519 verifying key. In text form it is the standard base64 of
/// the 32 key bytes with an `.ed25519` suffix; prefixed with `@` it is the
/// feed id of its owner.
///
/// # Examples
///
/// ```ignore
/// let secret_key = SecretKey::generate(&mut rand::rng());
/// let public_key = secret_key.public();
///
/// let id = public_key.id();          // "@....ed25519"
/// let recovered: PublicKey = id.parse()?;
/// assert_eq!(public_key, recovered);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(VerifyingKey);

impl From<VerifyingKey> for PublicKey {
    fn from(key: VerifyingKey) -> Self {
        PublicKey(key)
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() != PUBLIC_KEY_SIZE {
            return Err(anyhow::anyhow!(
                "invalid public key size, expected {}, got {}",
                PUBLIC_KEY_SIZE,
                bytes.len()
            )
            .into());
        }
        let mut buff = [0; PUBLIC_KEY_SIZE];
        buff.copy_from_slice(bytes);
        let key = VerifyingKey::from_bytes(&buff)
            .map_err(|_| anyhow::anyhow!("public key is not a valid ed25519 point"))?;
        Ok(PublicKey(key))
    }
}

impl PublicKey {
    /// Convert public key to raw bytes
    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_SIZE] {
        self.0.to_bytes()
    }

    /// The feed identifier of this key, `@base64.ed25519`
    pub fn id(&self) -> String {
        Identifier::feed(&self.to_bytes(), ED25519_TAG).to_string()
    }

    /// Convert Ed25519 public key to X25519 (Montgomery curve) for ECDH
    ///
    /// Envelopes encapsulate their message key with X25519, while identities
    /// are expressed as Ed25519 keys; this is the bridge between the two.
    ///
    /// # Errors
    ///
    /// Returns an error if the Ed25519 point cannot be converted (invalid point).
    #[allow(clippy::wrong_self_convention)]
    pub(crate) fn to_x25519(&self) -> Result<X25519PublicKey, KeyError> {
        let edwards_bytes = self.to_bytes();
        let edwards_point = CompressedEdwardsY::from_slice(&edwards_bytes)
            .map_err(|_| anyhow::anyhow!("public key invalid edwards point"))?
            .decompress()
            .ok_or_else(|| anyhow::anyhow!("public key failed to decompress edwards point"))?;

        let montgomery_point = edwards_point.to_montgomery();
        Ok(X25519PublicKey::from(montgomery_point.to_bytes()))
    }

    /// Verify an Ed25519 signature on a message.
    pub fn verify(&self, msg: &[u8], signature: &Signature) -> bool {
        self.0.verify_strict(msg, &signature.0).is_ok()
    }
}

/// Parses `@base64.ed25519` as well as the bare `base64.ed25519` form.
impl FromStr for PublicKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.strip_prefix(Sigil::Feed.as_char()).unwrap_or(s);
        let bytes = decode_tagged(s, ED25519_TAG)?;
        PublicKey::try_from(bytes.as_slice())
    }
}

/// The bare tagged form, `base64.ed25519`.
impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_tagged(&self.to_bytes(), ED25519_TAG))
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.id())
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Secret key for identity, signing and opening envelopes
///
/// The private half of an Ed25519 keypair. Its tagged text form is the
/// base64 of the 64-byte `seed || public` encoding, which is what key files
/// on the network have always stored.
///
/// # Security Considerations
///
/// - Never share this key over the network
/// - `Debug` output is redacted, so it is safe to log structs holding it
#[derive(Clone)]
pub struct SecretKey(SigningKey);

impl From<[u8; PRIVATE_KEY_SIZE]> for SecretKey {
    fn from(seed: [u8; PRIVATE_KEY_SIZE]) -> Self {
        Self(SigningKey::from_bytes(&seed))
    }
}

impl SecretKey {
    /// Generate a new secret key from the given cryptographically secure RNG
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut seed = [0u8; PRIVATE_KEY_SIZE];
        rng.fill_bytes(&mut seed);
        let key = Self::from(seed);
        seed.zeroize();
        key
    }

    /// Derive the public key from this secret key
    pub fn public(&self) -> PublicKey {
        PublicKey(self.0.verifying_key())
    }

    /// The 64-byte `seed || public` encoding
    pub fn to_keypair_bytes(&self) -> [u8; KEYPAIR_SIZE] {
        self.0.to_keypair_bytes()
    }

    /// Parse the 64-byte `seed || public` encoding
    ///
    /// # Errors
    ///
    /// Returns an error if the size is wrong or the embedded public half does
    /// not belong to the seed.
    pub fn from_keypair_bytes(bytes: &[u8]) -> Result<Self, KeyError> {
        if bytes.len() != KEYPAIR_SIZE {
            return Err(anyhow::anyhow!(
                "invalid private key size, expected {}, got {}",
                KEYPAIR_SIZE,
                bytes.len()
            )
            .into());
        }
        let mut buff = [0u8; KEYPAIR_SIZE];
        buff.copy_from_slice(bytes);
        let key = SigningKey::from_keypair_bytes(&buff)
            .map_err(|_| anyhow::anyhow!("private key does not match its public half"));
        buff.zeroize();
        Ok(Self(key?))
    }

    /// Tagged text form, `base64(seed || public).ed25519`
    pub fn to_tagged(&self) -> String {
        let mut bytes = self.to_keypair_bytes();
        let encoded = encode_tagged(&bytes, ED25519_TAG);
        bytes.zeroize();
        encoded
    }

    /// Convert Ed25519 secret key to X25519 (Montgomery curve) for ECDH
    ///
    /// The scalar bytes of the Ed25519 key are directly used as the X25519 private key.
    pub(crate) fn to_x25519(&self) -> StaticSecret {
        StaticSecret::from(self.0.to_scalar_bytes())
    }

    /// Sign a message with this secret key using Ed25519.
    pub fn sign(&self, msg: &[u8]) -> Signature {
        Signature(self.0.sign(msg))
    }
}

impl FromStr for SecretKey {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = decode_tagged(s, ED25519_TAG)?;
        let key = SecretKey::from_keypair_bytes(&bytes);
        bytes.zeroize();
        key
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}

/// A detached Ed25519 signature, `base64.sig.ed25519` in text form
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(ed25519_dalek::Signature);

impl Signature {
    pub fn to_bytes(&self) -> [u8; SIGNATURE_SIZE] {
        self.0.to_bytes()
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = KeyError;
    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let signature = ed25519_dalek::Signature::from_slice(bytes)
            .map_err(|_| anyhow::anyhow!("invalid signature size, got {}", bytes.len()))?;
        Ok(Signature(signature))
    }
}

impl FromStr for Signature {
    type Err = KeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = decode_tagged(s, SIGNATURE_TAG)?;
        Signature::try_from(bytes.as_slice())
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_tagged(&self.to_bytes(), SIGNATURE_TAG))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::identifier::get_tag;

    #[test]
    fn test_keypair_generation() {
        let private_key = SecretKey::generate(&mut rand::rng());
        let public_key = private_key.public();

        // Test round-trip conversion
        let private_tagged = private_key.to_tagged();
        let recovered_private: SecretKey = private_tagged.parse().unwrap();
        assert_eq!(
            private_key.to_keypair_bytes(),
            recovered_private.to_keypair_bytes()
        );

        let public_tagged = public_key.to_string();
        let recovered_public: PublicKey = public_tagged.parse().unwrap();
        assert_eq!(public_key, recovered_public);
    }

    #[test]
    fn test_seeded_generation_is_deterministic() {
        let a = SecretKey::generate(&mut StdRng::seed_from_u64(7));
        let b = SecretKey::generate(&mut StdRng::seed_from_u64(7));
        let c = SecretKey::generate(&mut StdRng::seed_from_u64(8));
        assert_eq!(a.public(), b.public());
        assert_ne!(a.public(), c.public());
    }

    #[test]
    fn test_id_format() {
        let public_key = SecretKey::generate(&mut rand::rng()).public();
        let id = public_key.id();
        assert!(id.starts_with('@'));
        assert_eq!(get_tag(&id), Some(ED25519_TAG));
        assert_eq!(&id[1..], public_key.to_string());

        // both the id and the bare form parse back to the same key
        assert_eq!(id.parse::<PublicKey>().unwrap(), public_key);
        assert_eq!(id[1..].parse::<PublicKey>().unwrap(), public_key);
    }

    #[test]
    fn test_public_key_rejects_wrong_tag() {
        let public_key = SecretKey::generate(&mut rand::rng()).public();
        let wrong = public_key.to_string().replace(".ed25519", ".sha256");
        assert!(wrong.parse::<PublicKey>().is_err());
    }

    #[test]
    fn test_private_key_rejects_mismatched_halves() {
        let a = SecretKey::generate(&mut rand::rng());
        let b = SecretKey::generate(&mut rand::rng());
        let mut bytes = a.to_keypair_bytes();
        bytes[PRIVATE_KEY_SIZE..].copy_from_slice(&b.public().to_bytes());
        assert!(SecretKey::from_keypair_bytes(&bytes).is_err());
    }

    #[test]
    fn test_x25519_conversion_agrees() {
        let alice = SecretKey::generate(&mut rand::rng());
        let bob = SecretKey::generate(&mut rand::rng());

        let ab = alice
            .to_x25519()
            .diffie_hellman(&bob.public().to_x25519().unwrap());
        let ba = bob
            .to_x25519()
            .diffie_hellman(&alice.public().to_x25519().unwrap());
        assert_eq!(ab.as_bytes(), ba.as_bytes());
    }

    #[test]
    fn test_sign_and_verify() {
        let secret_key = SecretKey::generate(&mut rand::rng());
        let public_key = secret_key.public();
        let message = b"hello, world!";

        let signature = secret_key.sign(message);
        assert!(public_key.verify(message, &signature));
        assert!(!public_key.verify(b"hello, world?", &signature));

        let other_key = SecretKey::generate(&mut rand::rng()).public();
        assert!(!other_key.verify(message, &signature));

        let text = signature.to_string();
        assert!(text.ends_with(".sig.ed25519"));
        assert_eq!(text.parse::<Signature>().unwrap(), signature);
    }

    #[test]
    fn test_debug_redacts_secret() {
        let secret_key = SecretKey::generate(&mut rand::rng());
        let debug = format!("{:?}", secret_key);
        assert_eq!(debug, "SecretKey([REDACTED])");
    }

    #[test]
    fn test_public_key_serde_json() {
        let public_key = SecretKey::generate(&mut rand::rng()).public();
        let json = serde_json::to_string(&public_key).unwrap();
        assert_eq!(json, format!("\"{}\"", public_key));
        let recovered: PublicKey = serde_json::from_str(&json).unwrap();
        assert_eq!(recovered, public_key);
    }
}
