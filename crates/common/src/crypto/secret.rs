//! Message encryption using XChaCha20-Poly1305
//!
//! Every envelope gets its own `Secret`. The body is sealed once under it and
//! the secret itself is then encapsulated per recipient, so the secret never
//! outlives the `box` / `unbox` call that uses it.

use std::fmt;

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    Key, XChaCha20Poly1305, XNonce,
};
use rand::{CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of XChaCha20-Poly1305 nonce in bytes
pub const NONCE_SIZE: usize = 24;
/// Size of XChaCha20-Poly1305 key in bytes (256 bits)
pub const SECRET_SIZE: usize = 32;
/// Size of the Poly1305 authentication tag in bytes
pub const TAG_SIZE: usize = 16;

/// Errors that can occur during encryption/decryption
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret error: {0}")]
    Default(#[from] anyhow::Error),
}

/// A 256-bit symmetric key
///
/// Used as the per-message key of an envelope and, derived per recipient,
/// as the key of each header slot. The bytes are wiped on drop.
#[derive(PartialEq, Eq, Clone, Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_SIZE]);

impl From<[u8; SECRET_SIZE]> for Secret {
    fn from(bytes: [u8; SECRET_SIZE]) -> Self {
        Secret(bytes)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret([REDACTED])")
    }
}

impl Secret {
    /// Generate a new random secret from the given RNG
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut buff = [0; SECRET_SIZE];
        rng.fill_bytes(&mut buff);
        Self(buff)
    }

    /// Create a secret from a byte slice
    ///
    /// # Errors
    ///
    /// Returns an error if the slice length is not exactly `SECRET_SIZE` bytes.
    pub fn from_slice(data: &[u8]) -> Result<Self, SecretError> {
        if data.len() != SECRET_SIZE {
            return Err(anyhow::anyhow!(
                "invalid secret size, expected {}, got {}",
                SECRET_SIZE,
                data.len()
            )
            .into());
        }
        let mut buff = [0; SECRET_SIZE];
        buff.copy_from_slice(data);
        Ok(buff.into())
    }

    /// Get a reference to the secret key bytes
    pub fn bytes(&self) -> &[u8] {
        self.0.as_ref()
    }

    fn cipher(&self) -> XChaCha20Poly1305 {
        XChaCha20Poly1305::new(Key::from_slice(self.bytes()))
    }

    /// Seal `data` under this secret and the caller's nonce.
    ///
    /// The output is `ciphertext || tag`; the nonce is not included; the
    /// caller is responsible for never reusing a nonce under the same secret.
    ///
    /// # Errors
    ///
    /// Returns an error if encryption fails.
    pub fn seal(&self, nonce: &[u8; NONCE_SIZE], data: &[u8]) -> Result<Vec<u8>, SecretError> {
        self.cipher()
            .encrypt(XNonce::from_slice(nonce), data)
            .map_err(|_| anyhow::anyhow!("encrypt error").into())
    }

    /// Open `ciphertext || tag` produced by [`Secret::seal`].
    ///
    /// Returns `None` if authentication fails: wrong key, wrong nonce or
    /// tampered data all look the same.
    pub fn open(&self, nonce: &[u8; NONCE_SIZE], data: &[u8]) -> Option<Vec<u8>> {
        if data.len() < TAG_SIZE {
            return None;
        }
        self.cipher().decrypt(XNonce::from_slice(nonce), data).ok()
    }
}
