use axum::extract::{Path, State};
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ShelfError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::library::gateway;
use crate::principal::Principal;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deleted {
    pub deleted: bool,
}

pub async fn handler(
    State(state): State<ServiceState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ShelfError> {
    gateway::delete_reviewer(&state, &principal, &id).await?;
    Ok(Json(Deleted { deleted: true }))
}

#[derive(Debug, Clone)]
pub struct DeleteReviewerRequest {
    pub id: Uuid,
}

impl ApiRequest for DeleteReviewerRequest {
    type Response = Deleted;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.delete(endpoint(base_url, &format!("/api/v0/reviewers/{}", self.id)))
    }
}
