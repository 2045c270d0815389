use clap::Args;

use common::identifier::get_tag;

/// Print the algorithm tag of an identifier or boxed value
#[derive(Args, Debug, Clone)]
pub struct Tag {
    pub value: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("no tag in `{0}`")]
    Missing(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Tag {
    type Error = TagError;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        get_tag(&self.value)
            .map(str::to_string)
            .ok_or_else(|| TagError::Missing(self.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::op::{Op, OpContext};

    #[tokio::test]
    async fn test_tag_of_feed_id() {
        let op = Tag {
            value: "@/02iw6SFEPIHl8nMkYSwcCgRWxiG6VP547Wcp1NW8Bo=.ed25519".to_string(),
        };
        assert_eq!(op.execute(&OpContext::default()).await.unwrap(), "ed25519");
    }

    #[tokio::test]
    async fn test_untagged_value_fails() {
        let op = Tag {
            value: "plain".to_string(),
        };
        assert!(op.execute(&OpContext::default()).await.is_err());
    }
}
