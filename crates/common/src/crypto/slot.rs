//! Per-recipient key slots
//!
//! An envelope carries its message key once per recipient. Each copy lives in
//! a fixed-size slot sealed with a key only that recipient can derive:
//!
//! 1. **One-shot keypair**: the sender generates an X25519 keypair for this
//!    envelope only; its public half travels in the envelope.
//! 2. **ECDH**: the recipient's Ed25519 key is converted to X25519 and
//!    combined with the one-shot secret.
//! 3. **Derive**: BLAKE3 in derive-key mode turns the shared secret, the
//!    one-shot public key and the recipient key into the slot key.
//! 4. **Seal**: `[slot_count || message_key]` is sealed with the slot key
//!    under a nonce unique to the slot index.
//!
//! The recipient reverses this with its own secret key. It does not know
//! which slot is its own, so it simply tries them in order.
//!
//! # Slot Format
//!
//! ```text
//! sealed([ slot_count: 1 byte ][ message_key: 32 bytes ]) = 49 bytes
//! ```

use std::fmt;

use rand::{CryptoRng, RngCore};
use x25519_dalek::{PublicKey as X25519PublicKey, StaticSecret};
use zeroize::Zeroize;

use super::keys::{KeyError, PublicKey, SecretKey, PUBLIC_KEY_SIZE};
use super::secret::{Secret, SecretError, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};

/// Size of a sealed slot in bytes
pub const SLOT_SIZE: usize = 1 + SECRET_SIZE + TAG_SIZE;
/// Maximum number of slots an envelope header can hold
pub const MAX_SLOTS: usize = u8::MAX as usize;
/// Size of the one-shot X25519 public key carried by an envelope
pub const EPHEMERAL_KEY_SIZE: usize = PUBLIC_KEY_SIZE;

const SLOT_KEY_CONTEXT: &str = "keybox 2024-06-01 envelope slot key";

/// Errors that can occur while sealing a slot
#[derive(Debug, thiserror::Error)]
pub enum SlotError {
    #[error("key error: {0}")]
    Key(#[from] KeyError),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
}

/// The content of a slot: the message key plus the number of slots in the
/// header it was found in, which is what locates the body.
#[derive(Clone, PartialEq, Eq)]
pub struct EnvelopeKey {
    secret: Secret,
    slots: u8,
}

impl EnvelopeKey {
    pub(crate) fn new(secret: Secret, slots: u8) -> Self {
        Self { secret, slots }
    }

    /// The per-message key
    pub fn secret(&self) -> &Secret {
        &self.secret
    }

    /// Number of slots in the envelope header, padding included
    pub fn slots(&self) -> usize {
        self.slots as usize
    }

    fn to_plaintext(&self) -> [u8; 1 + SECRET_SIZE] {
        let mut out = [0u8; 1 + SECRET_SIZE];
        out[0] = self.slots;
        out[1..].copy_from_slice(self.secret.bytes());
        out
    }
}

impl fmt::Debug for EnvelopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvelopeKey")
            .field("secret", &self.secret)
            .field("slots", &self.slots)
            .finish()
    }
}

/// Nonce for the slot at `index`
///
/// The slot index is mixed into the trailing two bytes of the envelope nonce
/// so that two slots sealed under the same key (a recipient listed twice)
/// never share a nonce, and no slot shares the body's nonce.
pub(crate) fn slot_nonce(nonce: &[u8; NONCE_SIZE], index: usize) -> [u8; NONCE_SIZE] {
    let counter = ((index as u16) + 1).to_be_bytes();
    let mut out = *nonce;
    out[NONCE_SIZE - 2] ^= counter[0];
    out[NONCE_SIZE - 1] ^= counter[1];
    out
}

fn slot_key(shared: &[u8; 32], ephemeral: &X25519PublicKey, recipient: &X25519PublicKey) -> Secret {
    let mut hasher = blake3::Hasher::new_derive_key(SLOT_KEY_CONTEXT);
    hasher.update(shared);
    hasher.update(ephemeral.as_bytes());
    hasher.update(recipient.as_bytes());
    Secret::from(*hasher.finalize().as_bytes())
}

/// Sender side: a one-shot X25519 keypair that seals slots for one envelope
pub(crate) struct Encapsulator {
    secret: StaticSecret,
    public: X25519PublicKey,
}

impl Encapsulator {
    pub fn generate<R: RngCore + CryptoRng + ?Sized>(rng: &mut R) -> Self {
        let mut bytes = [0u8; 32];
        rng.fill_bytes(&mut bytes);
        let secret = StaticSecret::from(bytes);
        bytes.zeroize();
        let public = X25519PublicKey::from(&secret);
        Self { secret, public }
    }

    pub fn public(&self) -> &X25519PublicKey {
        &self.public
    }

    /// Seal `key` for `recipient` into the slot at `index`
    ///
    /// # Errors
    ///
    /// Returns an error if the recipient key cannot be converted to X25519.
    pub fn seal(
        &self,
        key: &EnvelopeKey,
        recipient: &PublicKey,
        nonce: &[u8; NONCE_SIZE],
        index: usize,
    ) -> Result<[u8; SLOT_SIZE], SlotError> {
        let recipient_x25519 = recipient.to_x25519()?;
        let shared = self.secret.diffie_hellman(&recipient_x25519);
        let slot_key = slot_key(shared.as_bytes(), &self.public, &recipient_x25519);

        let mut plaintext = key.to_plaintext();
        let sealed = slot_key.seal(&slot_nonce(nonce, index), &plaintext);
        plaintext.zeroize();
        let sealed = sealed?;

        let mut slot = [0u8; SLOT_SIZE];
        if sealed.len() != SLOT_SIZE {
            return Err(SecretError::from(anyhow::anyhow!("sealed slot has wrong size")).into());
        }
        slot.copy_from_slice(&sealed);
        Ok(slot)
    }
}

/// Recipient side: the slot key derived from our secret key and the
/// envelope's one-shot public key
pub(crate) struct Decapsulator {
    slot_key: Option<Secret>,
}

impl Decapsulator {
    pub fn new(secret_key: &SecretKey, ephemeral: &X25519PublicKey) -> Self {
        let secret = secret_key.to_x25519();
        let own_public = X25519PublicKey::from(&secret);
        let shared = secret.diffie_hellman(ephemeral);

        // a low-order one-shot key yields a predictable shared secret
        let slot_key = shared
            .was_contributory()
            .then(|| slot_key(shared.as_bytes(), ephemeral, &own_public));
        Self { slot_key }
    }

    /// Try to open the slot at `index`
    ///
    /// Returns `None` if the slot was not sealed for us.
    pub fn open(&self, slot: &[u8], nonce: &[u8; NONCE_SIZE], index: usize) -> Option<EnvelopeKey> {
        let slot_key = self.slot_key.as_ref()?;
        let mut plaintext = slot_key.open(&slot_nonce(nonce, index), slot)?;

        let key = if plaintext.len() == 1 + SECRET_SIZE && (plaintext[0] as usize) > index {
            Secret::from_slice(&plaintext[1..])
                .ok()
                .map(|secret| EnvelopeKey::new(secret, plaintext[0]))
        } else {
            None
        };
        plaintext.zeroize();
        key
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn envelope_key(slots: u8) -> EnvelopeKey {
        EnvelopeKey::new(Secret::generate(&mut rand::rng()), slots)
    }

    #[test]
    fn test_seal_open_slot() {
        let key = envelope_key(1);
        let recipient = SecretKey::generate(&mut rand::rng());
        let nonce = [9u8; NONCE_SIZE];

        let encapsulator = Encapsulator::generate(&mut rand::rng());
        let slot = encapsulator
            .seal(&key, &recipient.public(), &nonce, 0)
            .unwrap();

        let decapsulator = Decapsulator::new(&recipient, encapsulator.public());
        let opened = decapsulator.open(&slot, &nonce, 0).unwrap();
        assert_eq!(opened, key);
        assert_eq!(opened.slots(), 1);
    }

    #[test]
    fn test_slot_different_keys() {
        let key = envelope_key(1);
        let alice = SecretKey::generate(&mut rand::rng());
        let bob = SecretKey::generate(&mut rand::rng());
        let nonce = [0u8; NONCE_SIZE];

        let encapsulator = Encapsulator::generate(&mut rand::rng());
        let slot = encapsulator.seal(&key, &alice.public(), &nonce, 0).unwrap();

        // Bob cannot open a slot sealed for Alice
        let decapsulator = Decapsulator::new(&bob, encapsulator.public());
        assert!(decapsulator.open(&slot, &nonce, 0).is_none());
    }

    #[test]
    fn test_slot_bound_to_index() {
        let key = envelope_key(2);
        let recipient = SecretKey::generate(&mut rand::rng());
        let nonce = [5u8; NONCE_SIZE];

        let encapsulator = Encapsulator::generate(&mut rand::rng());
        let slot = encapsulator
            .seal(&key, &recipient.public(), &nonce, 1)
            .unwrap();

        let decapsulator = Decapsulator::new(&recipient, encapsulator.public());
        assert!(decapsulator.open(&slot, &nonce, 0).is_none());
        assert!(decapsulator.open(&slot, &nonce, 1).is_some());
    }

    #[test]
    fn test_slot_count_must_cover_index() {
        // a slot claiming a count smaller than its own position is bogus
        let key = envelope_key(1);
        let recipient = SecretKey::generate(&mut rand::rng());
        let nonce = [5u8; NONCE_SIZE];

        let encapsulator = Encapsulator::generate(&mut rand::rng());
        let slot = encapsulator
            .seal(&key, &recipient.public(), &nonce, 3)
            .unwrap();

        let decapsulator = Decapsulator::new(&recipient, encapsulator.public());
        assert!(decapsulator.open(&slot, &nonce, 3).is_none());
    }

    #[test]
    fn test_slot_nonces_are_distinct() {
        let nonce = [0xAAu8; NONCE_SIZE];
        let mut seen = std::collections::HashSet::new();
        assert!(seen.insert(nonce));
        for index in 0..MAX_SLOTS {
            assert!(seen.insert(slot_nonce(&nonce, index)));
        }
    }

    #[test]
    fn test_low_order_ephemeral_is_rejected() {
        let recipient = SecretKey::generate(&mut rand::rng());
        let zero = X25519PublicKey::from([0u8; 32]);
        let decapsulator = Decapsulator::new(&recipient, &zero);
        assert!(decapsulator.open(&[0u8; SLOT_SIZE], &[0u8; NONCE_SIZE], 0).is_none());
    }
}
