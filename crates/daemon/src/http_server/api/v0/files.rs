use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Deserialize;

use crate::error::ShelfError;
use crate::library::gateway::{self, Disposition, FetchedFile};
use crate::ServiceState;

const IMMUTABLE_CACHE: &str = "public, max-age=31536000, immutable";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileQuery {
    /// `1` asks for an attachment; anything else is inline.
    #[serde(default)]
    pub download: Option<String>,
}

impl FileQuery {
    fn disposition(&self) -> Disposition {
        match self.download.as_deref() {
            Some("1") => Disposition::Attachment,
            _ => Disposition::Inline,
        }
    }
}

pub async fn handler(
    State(state): State<ServiceState>,
    Path(id): Path<String>,
    Query(query): Query<FileQuery>,
) -> Result<Response, ShelfError> {
    let file = gateway::fetch(&state, &id, query.disposition()).await?;
    Ok(file_response(file))
}

fn header_value(value: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"))
}

fn file_response(file: FetchedFile) -> Response {
    let content_disposition = HeaderValue::from_str(&file.content_disposition())
        .unwrap_or_else(|_| HeaderValue::from_static("inline"));

    (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, header_value(&file.content_type)),
            (header::CONTENT_DISPOSITION, content_disposition),
            (header::CONTENT_LENGTH, HeaderValue::from(file.content_length())),
            (header::CACHE_CONTROL, HeaderValue::from_static(IMMUTABLE_CACHE)),
        ],
        Body::from(file.bytes),
    )
        .into_response()
}
