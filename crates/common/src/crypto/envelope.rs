//! Multi-recipient envelopes
//!
//! `box` encrypts a value once under a fresh per-message key and encapsulates
//! that key once per recipient. `unbox` walks the header slots with the
//! caller's secret key and, if one opens, decrypts the body.
//!
//! # Wire Format
//!
//! ```text
//! [ nonce: 24 ][ one-shot x25519 pubkey: 32 ][ slot: 49 ] * n [ body: len + 16 ]
//! ```
//!
//! - `slot` is described in [`super::slot`]; slots follow the order of the
//!   recipient list, duplicates included, then any random padding slots
//! - `body` is the `serde_json` encoding of the value sealed under the
//!   per-message key with `nonce`
//!
//! The number of slots is never written in the clear. A recipient learns it
//! from the slot it opens, which is also how it finds the start of the body.
//!
//! # Failure Model
//!
//! Unboxing never errors. An envelope that is not addressed to us, one that
//! was tampered with, and one that is simply garbage all yield `None`, so
//! the caller cannot leak which of those it was.

use std::fmt;
use std::str::FromStr;

use rand::{CryptoRng, RngCore};
use serde::de::DeserializeOwned;
use serde::Serialize;
use x25519_dalek::PublicKey as X25519PublicKey;

use super::keys::{PublicKey, SecretKey};
use super::secret::{Secret, SecretError, NONCE_SIZE, TAG_SIZE};
use super::slot::{
    Decapsulator, Encapsulator, EnvelopeKey, SlotError, EPHEMERAL_KEY_SIZE, MAX_SLOTS, SLOT_SIZE,
};
use crate::identifier::{decode_tagged, encode_tagged, IdentifierError};

/// Tag of an envelope in text form, `base64.box`
pub const BOX_TAG: &str = "box";
/// Bytes preceding the first slot
pub const HEADER_PREFIX_SIZE: usize = NONCE_SIZE + EPHEMERAL_KEY_SIZE;
/// Smallest possible envelope: one slot and an empty body
pub const MIN_ENVELOPE_SIZE: usize = HEADER_PREFIX_SIZE + SLOT_SIZE + TAG_SIZE;

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("an envelope needs at least one recipient")]
    NoRecipients,
    #[error("too many recipients: {0} slots requested, at most {} allowed", MAX_SLOTS)]
    TooManyRecipients(usize),
    #[error("slot error: {0}")]
    Slot(#[from] SlotError),
    #[error("secret error: {0}")]
    Secret(#[from] SecretError),
    #[error("failed to serialize plaintext: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("malformed envelope: {0}")]
    Malformed(String),
}

impl From<IdentifierError> for EnvelopeError {
    fn from(err: IdentifierError) -> Self {
        EnvelopeError::Malformed(err.to_string())
    }
}

/// The bytes of a boxed message
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Envelope(Vec<u8>);

impl Envelope {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn nonce(&self) -> Option<[u8; NONCE_SIZE]> {
        self.0.get(..NONCE_SIZE)?.try_into().ok()
    }

    fn ephemeral(&self) -> Option<X25519PublicKey> {
        let bytes: [u8; EPHEMERAL_KEY_SIZE] =
            self.0.get(NONCE_SIZE..HEADER_PREFIX_SIZE)?.try_into().ok()?;
        Some(X25519PublicKey::from(bytes))
    }

    /// The slot at `index`, if the envelope is long enough to hold it and a body
    fn slot(&self, index: usize) -> Option<&[u8]> {
        let start = HEADER_PREFIX_SIZE + index * SLOT_SIZE;
        let end = start + SLOT_SIZE;
        if end + TAG_SIZE > self.0.len() {
            return None;
        }
        self.0.get(start..end)
    }

    fn body(&self, slots: usize) -> Option<&[u8]> {
        self.0.get(HEADER_PREFIX_SIZE + slots * SLOT_SIZE..)
    }
}

impl TryFrom<Vec<u8>> for Envelope {
    type Error = EnvelopeError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        if bytes.len() < MIN_ENVELOPE_SIZE {
            return Err(EnvelopeError::Malformed(format!(
                "expected at least {} bytes, got {}",
                MIN_ENVELOPE_SIZE,
                bytes.len()
            )));
        }
        Ok(Envelope(bytes))
    }
}

impl FromStr for Envelope {
    type Err = EnvelopeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Envelope::try_from(decode_tagged(s.trim(), BOX_TAG)?)
    }
}

/// The text form, `base64.box`
impl fmt::Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", encode_tagged(&self.0, BOX_TAG))
    }
}

impl fmt::Debug for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Envelope({} bytes)", self.0.len())
    }
}

/// Box `plaintext` for `recipients`.
///
/// Recipient order is preserved and duplicates are not removed.
///
/// # Errors
///
/// - [`EnvelopeError::NoRecipients`] if `recipients` is empty
/// - [`EnvelopeError::TooManyRecipients`] above [`MAX_SLOTS`]
/// - [`EnvelopeError::Serialize`] if `plaintext` cannot be encoded
pub fn box_value<T, R>(
    plaintext: &T,
    recipients: &[PublicKey],
    rng: &mut R,
) -> Result<Envelope, EnvelopeError>
where
    T: Serialize + ?Sized,
    R: RngCore + CryptoRng + ?Sized,
{
    box_padded(plaintext, recipients, 0, rng)
}

/// Box `plaintext` for `recipients`, padding the header with random slots
/// until it holds at least `min_slots`.
///
/// Padding slots are indistinguishable from slots sealed for someone else,
/// so an observer only learns an upper bound on the number of recipients.
pub fn box_padded<T, R>(
    plaintext: &T,
    recipients: &[PublicKey],
    min_slots: usize,
    rng: &mut R,
) -> Result<Envelope, EnvelopeError>
where
    T: Serialize + ?Sized,
    R: RngCore + CryptoRng + ?Sized,
{
    if recipients.is_empty() {
        return Err(EnvelopeError::NoRecipients);
    }
    let slots = recipients.len().max(min_slots);
    if slots > MAX_SLOTS {
        return Err(EnvelopeError::TooManyRecipients(slots));
    }

    let message = serde_json::to_vec(plaintext)?;

    let mut nonce = [0u8; NONCE_SIZE];
    rng.fill_bytes(&mut nonce);
    let key = EnvelopeKey::new(Secret::generate(rng), slots as u8);
    let body = key.secret().seal(&nonce, &message)?;

    let encapsulator = Encapsulator::generate(rng);

    let mut out = Vec::with_capacity(HEADER_PREFIX_SIZE + slots * SLOT_SIZE + body.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(encapsulator.public().as_bytes());
    for (index, recipient) in recipients.iter().enumerate() {
        out.extend_from_slice(&encapsulator.seal(&key, recipient, &nonce, index)?);
    }
    for _ in recipients.len()..slots {
        let mut padding = [0u8; SLOT_SIZE];
        rng.fill_bytes(&mut padding);
        out.extend_from_slice(&padding);
    }
    out.extend_from_slice(&body);

    tracing::debug!(
        recipients = recipients.len(),
        slots,
        size = out.len(),
        "boxed envelope"
    );

    Ok(Envelope(out))
}

/// Recover the per-message key of `envelope` with `secret_key`.
///
/// Returns `None` when no slot opens, which is the normal outcome for an
/// envelope addressed to someone else.
pub fn unbox_key(envelope: &Envelope, secret_key: &SecretKey) -> Option<EnvelopeKey> {
    let nonce = envelope.nonce()?;
    let decapsulator = Decapsulator::new(secret_key, &envelope.ephemeral()?);

    (0..MAX_SLOTS)
        .map_while(|index| envelope.slot(index).map(|slot| (index, slot)))
        .find_map(|(index, slot)| decapsulator.open(slot, &nonce, index))
}

/// Decrypt the body of `envelope` with a key from [`unbox_key`].
///
/// Returns `None` if the body fails authentication or does not decode as `T`.
pub fn unbox_body<T: DeserializeOwned>(envelope: &Envelope, key: &EnvelopeKey) -> Option<T> {
    let nonce = envelope.nonce()?;
    let body = envelope.body(key.slots())?;
    let message = key.secret().open(&nonce, body)?;
    serde_json::from_slice(&message).ok()
}

/// Open `envelope` with `secret_key`: [`unbox_key`] then [`unbox_body`].
pub fn unbox<T: DeserializeOwned>(envelope: &Envelope, secret_key: &SecretKey) -> Option<T> {
    let key = unbox_key(envelope, secret_key)?;
    unbox_body(envelope, &key)
}
