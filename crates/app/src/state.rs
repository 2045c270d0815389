use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use common::keyfile::{self, KeyFileError};
use common::keypair::{generate, Keypair, KeypairError};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "keybox";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const KEY_FILE_NAME: &str = "secret";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default log level, overridden by `RUST_LOG`
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Pad every envelope out to at least this many recipient slots
    #[serde(default)]
    pub min_slots: u8,
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            min_slots: 0,
        }
    }
}

impl AppConfig {
    pub fn level(&self) -> Result<tracing::Level, StateError> {
        tracing::Level::from_str(&self.log_level)
            .map_err(|_| StateError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the keybox directory (~/.keybox)
    pub keybox_dir: PathBuf,
    /// Path to the key record
    pub key_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the keybox directory path (custom or default ~/.keybox)
    pub fn keybox_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Check if the keybox directory exists
    pub fn exists(custom_path: Option<PathBuf>) -> Result<bool, StateError> {
        let keybox_dir = Self::keybox_dir(custom_path)?;
        Ok(keybox_dir.exists())
    }

    /// Initialize a new keybox directory with a fresh identity
    ///
    /// A failure after the directory was created removes it again, so
    /// `init` can be retried.
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<(Self, Keypair), StateError> {
        Self::init_with(custom_path, config, Self::populate)
    }

    fn init_with<F>(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
        populate: F,
    ) -> Result<(Self, Keypair), StateError>
    where
        F: FnOnce(&Path, &AppConfig) -> Result<Keypair, StateError>,
    {
        let keybox_dir = Self::keybox_dir(custom_path)?;

        if keybox_dir.exists() {
            return Err(StateError::AlreadyInitialized);
        }

        let config = config.unwrap_or_default();
        config.level()?;

        fs::create_dir_all(&keybox_dir)?;

        let keys = match populate(&keybox_dir, &config) {
            Ok(keys) => keys,
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&keybox_dir) {
                    tracing::warn!(
                        path = %keybox_dir.display(),
                        error = %cleanup,
                        "failed to remove partially initialized keybox directory"
                    );
                }
                return Err(e);
            }
        };

        let state = Self {
            key_path: keybox_dir.join(KEY_FILE_NAME),
            config_path: keybox_dir.join(CONFIG_FILE_NAME),
            keybox_dir,
            config,
        };
        Ok((state, keys))
    }

    /// Write a fresh key and the config into an empty keybox directory
    fn populate(keybox_dir: &Path, config: &AppConfig) -> Result<Keypair, StateError> {
        let keys = generate(None)?;
        keyfile::create_sync(keybox_dir.join(KEY_FILE_NAME), &keys)?;

        let config_toml = toml::to_string_pretty(config)?;
        fs::write(keybox_dir.join(CONFIG_FILE_NAME), config_toml)?;

        Ok(keys)
    }

    /// Load existing state from the keybox directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let keybox_dir = Self::keybox_dir(custom_path)?;

        if !keybox_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let key_path = keybox_dir.join(KEY_FILE_NAME);
        let config_path = keybox_dir.join(CONFIG_FILE_NAME);

        if !key_path.exists() {
            return Err(StateError::MissingFile(KEY_FILE_NAME.to_string()));
        }
        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            keybox_dir,
            key_path,
            config_path,
            config,
        })
    }

    /// Load the configuration if the directory was initialized, the defaults otherwise
    pub fn config_or_default(custom_path: Option<PathBuf>) -> Result<AppConfig, StateError> {
        if Self::exists(custom_path.clone())? {
            Ok(Self::load(custom_path)?.config)
        } else {
            Ok(AppConfig::default())
        }
    }

    /// Load the identity from the key file
    pub async fn load_keys(&self) -> Result<Keypair, StateError> {
        Ok(keyfile::load(&self.key_path).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("keybox directory not initialized. Run 'keybox init' first")]
    NotInitialized,

    #[error("keybox directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("invalid log level: {0}")]
    InvalidLogLevel(String),

    #[error("key file error: {0}")]
    KeyFile(#[from] KeyFileError),

    #[error("keypair error: {0}")]
    Keypair(#[from] KeypairError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
