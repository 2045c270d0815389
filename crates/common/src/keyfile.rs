//! # Key files
//!
//! A key file holds one [`KeyRecord`] as JSON, surrounded by `#` comment
//! lines that warn the owner not to share it. Comments are ignored on load.
//!
//! ## Creation
//!
//! Key files are never overwritten. A new file is written to a temporary
//! path in the target directory, synced, and then linked into place with
//! no-clobber semantics, so readers either see nothing or the whole file.
//! When two callers race to create the same path, exactly one link
//! succeeds; [`load_or_create_sync`] and [`load_or_create`] turn the loser
//! into a reader of the winner's key.
//!
//! ## Async
//!
//! The async variants run the blocking implementation on tokio's blocking
//! pool. Dropping the future does not cancel the file operation.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use crate::keypair::{Curve, KeyRecord, Keypair, KeypairError};

const TEMP_PREFIX: &str = ".keybox-";
const TEMP_SUFFIX: &str = ".tmp";

#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    #[error("key file not found: {0}")]
    NotFound(PathBuf),
    #[error("key file already exists: {0}")]
    AlreadyExists(PathBuf),
    #[error("corrupt key file: {0}")]
    Corrupt(String),
    #[error("unsupported curve in key file: {0}")]
    UnsupportedCurve(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("key file task failed: {0}")]
    Task(String),
}

impl From<KeypairError> for KeyFileError {
    fn from(err: KeypairError) -> Self {
        match err {
            KeypairError::Corrupt(reason) => KeyFileError::Corrupt(reason),
            KeypairError::UnsupportedCurve(curve) => KeyFileError::UnsupportedCurve(curve),
        }
    }
}

impl KeyRecord {
    /// Render the record as key file contents
    pub fn to_file_contents(&self) -> Result<String, KeyFileError> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| KeyFileError::Corrupt(e.to_string()))?;
        let id = self.id.as_deref().unwrap_or(&self.public);

        Ok(format!(
            "# keybox secret key\n\
             #\n\
             # Everything you publish is signed with this key, and everything\n\
             # boxed for you is opened with it. Whoever holds this file can act\n\
             # as you and read your private messages.\n\
             #\n\
             # Do not edit this file. Do not share it.\n\
             \n\
             {}\n\
             \n\
             # Share your public id instead:\n\
             # {}\n",
            json, id
        ))
    }

    /// Parse key file contents, ignoring `#` comment lines
    pub fn from_file_contents(contents: &str) -> Result<Self, KeyFileError> {
        let json: String = contents
            .lines()
            .filter(|line| !line.trim_start().starts_with('#'))
            .collect::<Vec<_>>()
            .join("\n");
        if json.trim().is_empty() {
            return Err(KeyFileError::Corrupt("no key record in file".to_string()));
        }
        serde_json::from_str(&json).map_err(|e| KeyFileError::Corrupt(e.to_string()))
    }
}

/// Load the keypair stored at `path`
///
/// The returned keypair's id always carries the `@` sigil, even when the
/// file stores it without one.
///
/// # Errors
///
/// - [`KeyFileError::NotFound`] if nothing exists at `path`
/// - [`KeyFileError::Corrupt`] if the contents do not decode to a valid record
pub fn load_sync(path: impl AsRef<Path>) -> Result<Keypair, KeyFileError> {
    let path = path.as_ref();
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(KeyFileError::NotFound(path.to_path_buf()))
        }
        Err(e) if e.kind() == ErrorKind::InvalidData => {
            return Err(KeyFileError::Corrupt("key file is not valid UTF-8".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    let record = KeyRecord::from_file_contents(&contents)?;
    let keypair = Keypair::from_record(&record)?;
    tracing::debug!(path = %path.display(), id = %keypair.id(), "loaded key file");
    Ok(keypair)
}

/// Write `keypair` to `path`, failing if the path already exists
///
/// Parent directories are created as needed. On unix the file is left
/// readable by its owner only.
///
/// # Errors
///
/// [`KeyFileError::AlreadyExists`] if `path` exists; the existing file is
/// left untouched.
pub fn create_sync(path: impl AsRef<Path>, keypair: &Keypair) -> Result<(), KeyFileError> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let contents = keypair.to_record().to_file_contents()?;
    let mut temp = tempfile::Builder::new()
        .prefix(TEMP_PREFIX)
        .suffix(TEMP_SUFFIX)
        .tempfile_in(dir)?;
    temp.write_all(contents.as_bytes())?;
    temp.as_file().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o400))?;
    }

    match temp.persist_noclobber(path) {
        Ok(_) => {
            tracing::debug!(path = %path.display(), id = %keypair.id(), "created key file");
            Ok(())
        }
        Err(e) if e.error.kind() == ErrorKind::AlreadyExists => {
            Err(KeyFileError::AlreadyExists(path.to_path_buf()))
        }
        Err(e) => Err(e.error.into()),
    }
}

/// Load the keypair at `path`, generating and storing a new one if the path
/// does not exist
///
/// Only [`KeyFileError::NotFound`] triggers creation; every other load error
/// is returned as is. If another writer creates the file first, its key is
/// loaded and returned instead.
pub fn load_or_create_sync(path: impl AsRef<Path>) -> Result<Keypair, KeyFileError> {
    let path = path.as_ref();
    match load_sync(path) {
        Err(KeyFileError::NotFound(_)) => {}
        loaded => return loaded,
    }

    let keypair = Keypair::generate(Curve::default(), &mut rand::rng());
    match create_sync(path, &keypair) {
        Ok(()) => Ok(keypair),
        Err(KeyFileError::AlreadyExists(_)) => {
            tracing::warn!(
                path = %path.display(),
                "key file was created concurrently, loading it instead"
            );
            load_sync(path)
        }
        Err(e) => Err(e),
    }
}

async fn run_blocking<T, F>(f: F) -> Result<T, KeyFileError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, KeyFileError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| KeyFileError::Task(e.to_string()))?
}

/// Async [`load_sync`]
pub async fn load(path: impl AsRef<Path>) -> Result<Keypair, KeyFileError> {
    let path = path.as_ref().to_path_buf();
    run_blocking(move || load_sync(path)).await
}

/// Async [`create_sync`]
pub async fn create(path: impl AsRef<Path>, keypair: Keypair) -> Result<(), KeyFileError> {
    let path = path.as_ref().to_path_buf();
    run_blocking(move || create_sync(path, &keypair)).await
}

/// Async [`load_or_create_sync`]
pub async fn load_or_create(path: impl AsRef<Path>) -> Result<Keypair, KeyFileError> {
    let path = path.as_ref().to_path_buf();
    run_blocking(move || load_or_create_sync(path)).await
}
