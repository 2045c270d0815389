use clap::Args;

use common::crypto::{unbox, Envelope, EnvelopeError};
use serde_json::Value;

/// Open a boxed value addressed to this identity
#[derive(Args, Debug, Clone)]
pub struct Unbox {
    /// Boxed value (`base64.box`)
    pub boxed: String,
}

#[derive(Debug, thiserror::Error)]
pub enum UnboxError {
    #[error(transparent)]
    State(#[from] crate::state::StateError),
    #[error("malformed boxed value: {0}")]
    Malformed(#[from] EnvelopeError),
    /// Not addressed to us, tampered with, or not JSON: all look the same
    #[error("cannot open this box")]
    CannotOpen,
    #[error("failed to print value: {0}")]
    Json(#[from] serde_json::Error),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Unbox {
    type Error = UnboxError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.state()?.load_keys().await?;
        let envelope: Envelope = self.boxed.trim().parse()?;

        let value: Value = unbox(&envelope, keys.secret()).ok_or(UnboxError::CannotOpen)?;
        Ok(serde_json::to_string_pretty(&value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::op::{Op, OpContext};
    use crate::cli::ops::BoxValue;
    use crate::state::AppState;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_box_then_unbox_for_self() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("keybox");
        let (_, keys) = AppState::init(Some(dir.clone()), None).unwrap();
        let ctx = OpContext::new(Some(dir));

        let boxed = BoxValue {
            to: vec![keys.id()],
            value: r#"{"okay":true}"#.to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();
        assert!(boxed.ends_with(".box"));

        let opened = Unbox { boxed }.execute(&ctx).await.unwrap();
        let value: Value = serde_json::from_str(&opened).unwrap();
        assert_eq!(value, serde_json::json!({"okay": true}));
    }

    #[tokio::test]
    async fn test_unbox_for_someone_else() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("keybox");
        AppState::init(Some(dir.clone()), None).unwrap();
        let ctx = OpContext::new(Some(dir));

        let other = common::keypair::generate(None).unwrap();
        let boxed = BoxValue {
            to: vec![other.id()],
            value: "1".to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();

        assert!(matches!(
            Unbox { boxed }.execute(&ctx).await,
            Err(UnboxError::CannotOpen)
        ));
    }

    #[tokio::test]
    async fn test_tampered_and_foreign_boxes_fail_alike() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("keybox");
        let (_, keys) = AppState::init(Some(dir.clone()), None).unwrap();
        let ctx = OpContext::new(Some(dir));

        let for_self = BoxValue {
            to: vec![keys.id()],
            value: r#"{"okay":true}"#.to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();
        let mut bytes = for_self.parse::<Envelope>().unwrap().into_bytes();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = Envelope::try_from(bytes).unwrap().to_string();

        let stranger = common::keypair::generate(None).unwrap();
        let foreign = BoxValue {
            to: vec![stranger.id()],
            value: r#"{"okay":true}"#.to_string(),
        }
        .execute(&ctx)
        .await
        .unwrap();

        let tampered_err = Unbox { boxed: tampered }.execute(&ctx).await.unwrap_err();
        let foreign_err = Unbox { boxed: foreign }.execute(&ctx).await.unwrap_err();
        assert!(matches!(tampered_err, UnboxError::CannotOpen));
        assert!(matches!(foreign_err, UnboxError::CannotOpen));
        assert_eq!(tampered_err.to_string(), foreign_err.to_string());
    }
}
