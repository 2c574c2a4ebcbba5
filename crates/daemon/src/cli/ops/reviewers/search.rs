use clap::Args;

use studyshelf::http_server::api::client::ApiError;
use studyshelf::http_server::api::v0::SearchRequest;

#[derive(Args, Debug, Clone)]
pub struct Search {
    /// Text to look for in titles, descriptions, subjects and tags
    pub query: String,
}

#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("API error: {0}")]
    Api(#[from] ApiError),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Search {
    type Error = SearchError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let mut client = ctx.client.clone();
        let response = client
            .call(SearchRequest {
                q: self.query.clone(),
            })
            .await?;
        Ok(super::render(&response.reviewers))
    }
}
