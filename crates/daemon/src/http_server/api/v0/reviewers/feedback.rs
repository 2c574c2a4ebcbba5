//! Student feedback on a reviewer: helpful votes and reports.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use reqwest::{Client, RequestBuilder, Url};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::{Report, Reviewer};
use crate::error::ShelfError;
use crate::http_server::api::client::{endpoint, ApiRequest};
use crate::http_server::extract::MaybePrincipal;
use crate::library::catalog;
use crate::principal::Principal;
use crate::ServiceState;

pub async fn helpful(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
) -> Result<Json<Reviewer>, ShelfError> {
    Ok(Json(catalog::mark_helpful(&state, &id).await?))
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportBody {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

pub async fn report(
    State(state): State<ServiceState>,
    MaybePrincipal(principal): MaybePrincipal,
    Path(id): Path<String>,
    Json(body): Json<ReportBody>,
) -> Result<(StatusCode, Json<Report>), ShelfError> {
    let report = catalog::report_reviewer(
        &state,
        principal.as_ref(),
        &id,
        body.reason.as_deref(),
        body.details.as_deref(),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(report)))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportList {
    pub reports: Vec<Report>,
}

pub async fn reports(
    State(state): State<ServiceState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<ReportList>, ShelfError> {
    let reports = catalog::list_reports(&state, &principal, &id).await?;
    Ok(Json(ReportList { reports }))
}

#[derive(Debug, Clone)]
pub struct HelpfulRequest {
    pub id: Uuid,
}

impl ApiRequest for HelpfulRequest {
    type Response = Reviewer;

    fn build_request(self, base_url: &Url, client: &Client) -> RequestBuilder {
        client.post(endpoint(
            base_url,
            &format!("/api/v0/reviewers/{}/helpful", self.id),
        ))
    }
}
