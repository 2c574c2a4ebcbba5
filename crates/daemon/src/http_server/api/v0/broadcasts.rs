use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::reviewers::delete::Deleted;
use crate::database::models::Broadcast;
use crate::error::ShelfError;
use crate::library::catalog::{self, BroadcastDraft};
use crate::principal::Principal;
use crate::ServiceState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcastList {
    pub broadcasts: Vec<Broadcast>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBroadcastBody {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub expires_at: Option<OffsetDateTime>,
    #[serde(default)]
    pub dismissible: Option<bool>,
}

impl From<CreateBroadcastBody> for BroadcastDraft {
    fn from(body: CreateBroadcastBody) -> Self {
        BroadcastDraft {
            title: body.title,
            message: body.message,
            kind: body.kind,
            expires_at: body.expires_at,
            dismissible: body.dismissible,
        }
    }
}

/// Broadcasts a visitor should see right now.
pub async fn active(State(state): State<ServiceState>) -> Result<Json<BroadcastList>, ShelfError> {
    let broadcasts = catalog::active_broadcasts(&state).await?;
    Ok(Json(BroadcastList { broadcasts }))
}

pub async fn all(
    State(state): State<ServiceState>,
    principal: Principal,
) -> Result<Json<BroadcastList>, ShelfError> {
    let broadcasts = catalog::all_broadcasts(&state, &principal).await?;
    Ok(Json(BroadcastList { broadcasts }))
}

pub async fn create(
    State(state): State<ServiceState>,
    principal: Principal,
    Json(body): Json<CreateBroadcastBody>,
) -> Result<(StatusCode, Json<Broadcast>), ShelfError> {
    let broadcast = catalog::create_broadcast(&state, &principal, body.into()).await?;
    Ok((StatusCode::CREATED, Json(broadcast)))
}

pub async fn toggle(
    State(state): State<ServiceState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Broadcast>, ShelfError> {
    Ok(Json(catalog::toggle_broadcast(&state, &principal, &id).await?))
}

pub async fn delete(
    State(state): State<ServiceState>,
    principal: Principal,
    Path(id): Path<String>,
) -> Result<Json<Deleted>, ShelfError> {
    catalog::delete_broadcast(&state, &principal, &id).await?;
    Ok(Json(Deleted { deleted: true }))
}
