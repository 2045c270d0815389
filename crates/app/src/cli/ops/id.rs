use clap::Args;

#[derive(Args, Debug, Clone)]
pub struct Id;

#[derive(Debug, thiserror::Error)]
pub enum IdError {
    #[error(transparent)]
    State(#[from] crate::state::StateError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Id {
    type Error = IdError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let keys = ctx.state()?.load_keys().await?;
        Ok(keys.id())
    }
}
