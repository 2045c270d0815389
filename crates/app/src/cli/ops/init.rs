use clap::Args;

use crate::state::{AppConfig, AppState};

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// Default log level written to config.toml
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    /// Pad every envelope out to at least this many recipient slots
    #[arg(long, default_value_t = 0)]
    pub min_slots: u8,
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            log_level: self.log_level.clone(),
            min_slots: self.min_slots,
        };

        let (state, keys) = AppState::init(ctx.config_path.clone(), Some(config))?;
        tracing::info!(id = %keys.id(), "initialized keybox");

        let output = format!(
            "Initialized keybox directory at: {}\n\
             - Key: {}\n\
             - Config: {}\n\
             - Log level: {}\n\
             - Minimum slots: {}\n\
             - Id: {}",
            state.keybox_dir.display(),
            state.key_path.display(),
            state.config_path.display(),
            state.config.log_level,
            state.config.min_slots,
            keys.id()
        );

        Ok(output)
    }
}
