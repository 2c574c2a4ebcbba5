//! Student-submitted reviewers and their moderation.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::database::models::{Reviewer, ReviewerRequest};
use crate::database::types::RequestStatus;
use crate::error::ShelfError;
use crate::http_server::extract::read_upload_form;
use crate::library::ingest::{self, RequestSubmission};
use crate::library::validation::{self, UploadKind};
use crate::library::{catalog, gateway};
use crate::principal::Principal;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestList {
    pub requests: Vec<ReviewerRequest>,
}

pub async fn list(
    State(state): State<ServiceState>,
    principal: Principal,
    Query(query): Query<ListQuery>,
) -> Result<Json<RequestList>, ShelfError> {
    let status = validation::choice::<RequestStatus>(query.status.as_deref())?;
    let requests = catalog::list_requests(&state, &principal, status).await?;
    Ok(Json(RequestList { requests }))
}

pub async fn submit(
    State(state): State<ServiceState>,
    principal: Principal,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ReviewerRequest>), ShelfError> {
    let mut form = read_upload_form(multipart, UploadKind::ReviewerRequest).await?;
    let submission = RequestSubmission {
        title: form.take("title"),
        description: form.take("description"),
        subject: form.take("subject"),
        grade_level: form.take("gradeLevel"),
        author: form.take("author"),
        component: form.take("component"),
        student_name: form.take("studentName"),
        student_section: form.take("studentSection"),
        file: form.file.take(),
    };

    let request = ingest::submit_request(&state, &principal, submission).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn approve(
    State(state): State<ServiceState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Reviewer>, ShelfError> {
    Ok(Json(gateway::approve_request(&state, &principal, &id).await?))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rejected {
    pub rejected: bool,
}

pub async fn reject(
    State(state): State<ServiceState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Rejected>, ShelfError> {
    gateway::reject_request(&state, &principal, &id).await?;
    Ok(Json(Rejected { rejected: true }))
}
