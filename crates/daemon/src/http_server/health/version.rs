use axum::response::IntoResponse;
use axum::Json;

use crate::version::build_info;

pub async fn handler() -> impl IntoResponse {
    Json(build_info())
}
