use clap::Args;

use common::crypto::{box_padded, EnvelopeError, KeyError, PublicKey};

/// Box a JSON value so only the given identities can open it
#[derive(Args, Debug, Clone)]
pub struct BoxValue {
    /// Recipient id (`@...ed25519`), repeatable
    #[arg(long = "to", required = true)]
    pub to: Vec<String>,

    /// JSON value to box
    pub value: String,
}

#[derive(Debug, thiserror::Error)]
pub enum BoxError {
    #[error(transparent)]
    State(#[from] crate::state::StateError),
    #[error("invalid recipient `{0}`: {1}")]
    Recipient(String, KeyError),
    #[error("invalid JSON value: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to box value: {0}")]
    Envelope(#[from] EnvelopeError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for BoxValue {
    type Error = BoxError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = ctx.config()?;
        let recipients = self
            .to
            .iter()
            .map(|id| {
                id.parse::<PublicKey>()
                    .map_err(|e| BoxError::Recipient(id.clone(), e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        let value = super::parse_json(&self.value)?;

        let envelope = box_padded(
            &value,
            &recipients,
            usize::from(config.min_slots),
            &mut rand::rng(),
        )?;
        Ok(envelope.to_string())
    }
}
