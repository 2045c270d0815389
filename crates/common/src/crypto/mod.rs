//! Cryptographic primitives for keybox
//!
//! - **Identity & Signing**: Ed25519 keypairs, tagged `base64.ed25519`
//! - **Envelopes**: XChaCha20-Poly1305 bodies under a fresh per-message key
//! - **Key Encapsulation**: one slot per recipient, ECDH over X25519 keys
//!   converted from the recipients' Ed25519 identities
//!
//! # Envelope Protocol
//!
//! To box a value for a set of recipients:
//! 1. Generate a per-message `Secret` and a 24-byte nonce
//! 2. Seal the `serde_json` encoding of the value under the secret
//! 3. Generate a one-shot X25519 keypair
//! 4. For each recipient, convert their Ed25519 key to X25519, perform ECDH
//!    with the one-shot secret and seal the message key into a slot
//! 5. Package as `nonce || one-shot public key || slots || body`
//!
//! A recipient recovers the value by:
//! 1. Performing ECDH between their own converted secret key and the
//!    one-shot public key
//! 2. Trying each slot in turn until one opens
//! 3. Opening the body with the recovered message key
//!
//! All randomness comes from an RNG passed in by the caller, so tests can
//! use a seeded generator.

mod envelope;
mod keys;
mod secret;
mod slot;

pub use envelope::{
    box_padded, box_value, unbox, unbox_body, unbox_key, Envelope, EnvelopeError, BOX_TAG,
    HEADER_PREFIX_SIZE, MIN_ENVELOPE_SIZE,
};
pub use keys::{
    KeyError, PublicKey, SecretKey, Signature, ED25519_TAG, KEYPAIR_SIZE, PRIVATE_KEY_SIZE,
    PUBLIC_KEY_SIZE, SIGNATURE_TAG,
};
pub use secret::{Secret, SecretError, NONCE_SIZE, SECRET_SIZE, TAG_SIZE};
pub use slot::{EnvelopeKey, SlotError, MAX_SLOTS, SLOT_SIZE};
