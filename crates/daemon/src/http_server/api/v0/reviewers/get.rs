use axum::extract::{Path, State};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use uuid::Uuid;

use crate::database::models::Reviewer;
use crate::error::ShelfError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::library::catalog;
use crate::ServiceState;

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<Reviewer>, ShelfError> {
    Ok(Json(catalog::get_reviewer(&state, &id).await?))
}

#[derive(Debug, Clone)]
pub struct GetReviewerRequest {
    pub id: Uuid,
}

impl ApiRequest for GetReviewerRequest {
    type Response = Reviewer;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.get(endpoint(base_url, &format!("/api/v0/reviewers/{}", self.id)))
    }
}
