use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use super::reviewers::delete::Deleted;
use crate::database::models::{CatalogFilter, Pointer};
use crate::error::ShelfError;
use crate::http_server::extract::read_upload_form;
use crate::library::ingest::{self, PointerUpload};
use crate::library::validation::UploadKind;
use crate::library::{catalog, gateway};
use crate::principal::Principal;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointerList {
    pub pointers: Vec<Pointer>,
}

pub async fn list(
    State(state): State<ServiceState>,
    Query(filter): Query<CatalogFilter>,
) -> Result<Json<PointerList>, ShelfError> {
    let pointers = catalog::list_pointers(&state, &filter).await?;
    Ok(Json(PointerList { pointers }))
}

pub async fn upload(
    State(state): State<ServiceState>,
    principal: Principal,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Pointer>), ShelfError> {
    principal.require_staff()?;

    let mut form = read_upload_form(multipart, UploadKind::Pointer).await?;
    let upload = PointerUpload {
        title: form.take("title"),
        description: form.take("description"),
        subject: form.take("subject"),
        teacher: form.take("teacher"),
        grade_level: form.take("gradeLevel"),
        file: form.file.take(),
    };

    let pointer = ingest::upload_pointer(&state, &principal, upload).await?;
    Ok((StatusCode::CREATED, Json(pointer)))
}

pub async fn delete(
    State(state): State<ServiceState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ShelfError> {
    gateway::delete_pointer(&state, &principal, &id).await?;
    Ok(Json(Deleted { deleted: true }))
}
