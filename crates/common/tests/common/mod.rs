//! Shared test utilities for key file and envelope integration tests
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use common::keypair::{generate, Keypair};
use tempfile::TempDir;

/// Set up a scratch directory and a key file path inside it that does not exist yet
pub fn setup_key_path() -> (PathBuf, TempDir) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("secret");
    assert!(!path.exists());
    (path, temp_dir)
}

/// Write a freshly generated key record to `path` as plain JSON, with the
/// sigil stripped from its id the way legacy tools stored it.
/// Returns the keypair and the id as stored.
pub fn write_presigil_record(path: &Path) -> (Keypair, String) {
    let keys = generate(Some("ed25519")).unwrap();
    let mut record = keys.to_record();
    let stored_id = keys.id()[1..].to_string();
    record.id = Some(stored_id.clone());
    fs::write(path, serde_json::to_string(&record).unwrap()).unwrap();
    (keys, stored_id)
}

/// Generate `n` keypairs
pub fn keypairs(n: usize) -> Vec<Keypair> {
    (0..n).map(|_| generate(None).unwrap()).collect()
}
