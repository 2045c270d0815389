/**
 * Cryptographic types and operations.
 *  - Public and secret key implementations
 *  - Multi-recipient envelopes
 */
pub mod crypto;
/**
 * Tagged identifiers (`@`, `%`, `&` and bare)
 *  and the tag dispatch helpers.
 */
pub mod identifier;
/**
 * Key files on disk: load, create,
 *  and load-or-create with a single writer.
 */
pub mod keyfile;
/**
 * Identity keypairs and their serialized record.
 */
pub mod keypair;
/**
 * Signing and verifying JSON objects.
 */
pub mod signed;

pub mod prelude {
    pub use crate::crypto::{box_value, unbox, Envelope, PublicKey, SecretKey};
    pub use crate::identifier::{get_tag, Identifier, Sigil};
    pub use crate::keyfile::{load, load_or_create, load_or_create_sync, load_sync, KeyFileError};
    pub use crate::keypair::{generate, Curve, KeyRecord, Keypair};
}
