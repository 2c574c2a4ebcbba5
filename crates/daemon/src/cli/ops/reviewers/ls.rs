use clap::Args;

use studyshelf::http_server::api::client::ApiError;
use studyshelf::http_server::api::v0::ListReviewersRequest;

#[derive(Args, Debug, Clone)]
pub struct Ls {
    #[command(flatten)]
    pub filter: ListReviewersRequest,
}

#[derive(Debug, thiserror::Error)]
pub enum LsError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Ls {
    type Error = LsError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client.call(self.filter.clone()).await?;
        Ok(super::render(&response.reviewers))
    }
}
