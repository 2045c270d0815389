use std::convert::Infallible;

use clap::Args;

use crate::version::build_info;

#[derive(Args, Debug, Clone)]
pub struct Version;

#[async_trait::async_trait]
impl crate::cli::op::Op for Version {
    type Error = Infallible;
    type Output = String;

    async fn execute(&self, _ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        Ok(build_info().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::op::{Op, OpContext};

    #[tokio::test]
    async fn test_version_needs_no_state() {
        let ctx = OpContext::new(Some("/nonexistent/keybox".into()));
        let output = Version.execute(&ctx).await.unwrap();
        assert!(output.starts_with(env!("CARGO_PKG_NAME")));
    }
}
