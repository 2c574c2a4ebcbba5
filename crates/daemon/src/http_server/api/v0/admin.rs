use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;

use crate::error::ShelfError;
use crate::library::gateway::{self, OrphanReport};
use crate::principal::Principal;
use crate::ServiceState;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct OrphanQuery {
    #[serde(default)]
    pub purge: Option<String>,
}

impl OrphanQuery {
    fn purge(&self) -> bool {
        matches!(self.purge.as_deref(), Some("1") | Some("true"))
    }
}

pub async fn orphans(
    State(state): State<ServiceState>,
    principal: Principal,
    Query(query): Query<OrphanQuery>,
) -> Result<Json<OrphanReport>, ShelfError> {
    Ok(Json(
        gateway::orphaned_blobs(&state, &principal, query.purge()).await?,
    ))
}
