use clap::Args;

use common::crypto::{KeyError, PublicKey};
use common::signed::{verify_object, verify_object_with_hmac, HmacKey, SignedError};

/// Check the signature on a JSON object
#[derive(Args, Debug, Clone)]
pub struct Verify {
    /// Signed JSON object
    pub value: String,

    /// Author id to check against (defaults to this identity)
    #[arg(long)]
    pub key: Option<String>,

    /// Base64 32-byte key the object was signed under
    #[arg(long)]
    pub hmac_key: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error(transparent)]
    State(#[from] crate::state::StateError),
    #[error("invalid author id: {0}")]
    Key(#[from] KeyError),
    #[error("invalid JSON value: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    HmacKey(#[from] SignedError),
    #[error("signature is not valid for {0}")]
    Invalid(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Verify {
    type Error = VerifyError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let author = match &self.key {
            Some(id) => id.parse::<PublicKey>()?,
            None => *ctx.state()?.load_keys().await?.public(),
        };
        let hmac_key = self
            .hmac_key
            .as_deref()
            .map(str::parse::<HmacKey>)
            .transpose()?;
        let value = super::parse_json(&self.value)?;

        let valid = match &hmac_key {
            Some(hmac_key) => verify_object_with_hmac(&author, hmac_key, &value),
            None => verify_object(&author, &value),
        };
        if valid {
            Ok(format!("valid signature by {}", author.id()))
        } else {
            Err(VerifyError::Invalid(author.id()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::op::{Op, OpContext};
    use crate::cli::ops::Sign;
    use crate::state::AppState;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_sign_then_verify() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("keybox");
        let (_, keys) = AppState::init(Some(dir.clone()), None).unwrap();
        let ctx = OpContext::new(Some(dir));

        let signed = Sign {
            value: r#"{"type":"post","text":"hi"}"#.to_string(),
            hmac_key: None,
        }
        .execute(&ctx)
        .await
        .unwrap();

        let own = Verify {
            value: signed.clone(),
            key: None,
            hmac_key: None,
        };
        assert!(own.execute(&ctx).await.is_ok());

        let explicit = Verify {
            value: signed.clone(),
            key: Some(keys.id()),
            hmac_key: None,
        };
        assert!(explicit.execute(&OpContext::default()).await.is_ok());

        let stranger = common::keypair::generate(None).unwrap();
        let wrong = Verify {
            value: signed,
            key: Some(stranger.id()),
            hmac_key: None,
        };
        assert!(matches!(
            wrong.execute(&ctx).await,
            Err(VerifyError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_hmac_signed_needs_the_key() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("keybox");
        AppState::init(Some(dir.clone()), None).unwrap();
        let ctx = OpContext::new(Some(dir));
        let network = "AQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQEBAQE=".to_string();

        let signed = Sign {
            value: r#"{"type":"post"}"#.to_string(),
            hmac_key: Some(network.clone()),
        }
        .execute(&ctx)
        .await
        .unwrap();

        let with_key = Verify {
            value: signed.clone(),
            key: None,
            hmac_key: Some(network),
        };
        assert!(with_key.execute(&ctx).await.is_ok());

        let without_key = Verify {
            value: signed,
            key: None,
            hmac_key: None,
        };
        assert!(matches!(
            without_key.execute(&ctx).await,
            Err(VerifyError::Invalid(_))
        ));

        let short_key = Sign {
            value: "{}".to_string(),
            hmac_key: Some("AQID".to_string()),
        };
        assert!(short_key.execute(&ctx).await.is_err());
    }
}
