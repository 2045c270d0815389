use clap::Args;

use common::signed::{sign_object, sign_object_with_hmac, HmacKey, SignedError};

/// Sign a JSON object with this identity
#[derive(Args, Debug, Clone)]
pub struct Sign {
    /// JSON object to sign
    pub value: String,

    /// Base64 32-byte key; signs the HMAC of the object instead
    #[arg(long)]
    pub hmac_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SignError {
    #[error(transparent)]
    State(#[from] crate::state::StateError),
    #[error("invalid JSON value: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to sign: {0}")]
    Signed(#[from] SignedError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Sign {
    type Error = SignError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let hmac_key = self
            .hmac_key
            .as_deref()
            .map(str::parse::<HmacKey>)
            .transpose()?;
        let keys = ctx.state()?.load_keys().await?;
        let value = super::parse_json(&self.value)?;

        let signed = match &hmac_key {
            Some(hmac_key) => sign_object_with_hmac(&keys, hmac_key, &value)?,
            None => sign_object(&keys, &value)?,
        };
        Ok(serde_json::to_string_pretty(&signed)?)
    }
}
