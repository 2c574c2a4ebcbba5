use axum::extract::{Query, State};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use super::reviewers::ReviewerList;
use crate::error::ShelfError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::library::catalog;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    #[serde(default)]
    pub q: String,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Query(req): Query<SearchRequest>,
) -> Result<Json<ReviewerList>, ShelfError> {
    let reviewers = catalog::search_reviewers(&state, &req.q).await?;
    Ok(Json(ReviewerList { reviewers }))
}

impl ApiRequest for SearchRequest {
    type Response = ReviewerList;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .get(endpoint(base_url, "/api/v0/search"))
            .query(&self)
    }
}
