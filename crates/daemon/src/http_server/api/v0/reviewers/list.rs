use axum::extract::{Query, State};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};

use crate::database::models::{CatalogFilter, Reviewer};
use crate::error::ShelfError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::library::catalog;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Serialize, Deserialize, clap::Args)]
pub struct ListReviewersRequest {
    /// Only reviewers tagged for this grade
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,

    /// Only reviewers for this subject (exact match)
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Maximum number of reviewers to return
    #[arg(long)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl From<ListReviewersRequest> for CatalogFilter {
    fn from(req: ListReviewersRequest) -> Self {
        CatalogFilter {
            grade: req.grade,
            subject: req.subject,
            q: None,
            limit: req.limit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewerList {
    pub reviewers: Vec<Reviewer>,
}

pub async fn handler(
    State(state): State<ServiceState>,
    Query(req): Query<ListReviewersRequest>,
) -> Result<Json<ReviewerList>, ShelfError> {
    let reviewers = catalog::list_reviewers(&state, &req.into()).await?;
    Ok(Json(ReviewerList { reviewers }))
}

impl ApiRequest for ListReviewersRequest {
    type Response = ReviewerList;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client
            .get(endpoint(base_url, "/api/v0/reviewers"))
            .query(&self)
    }
}
