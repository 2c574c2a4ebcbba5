use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use blob_store::BlobStoreError;
use serde::{Deserialize, Serialize};

/// Every failure a library operation can report to its caller.
#[derive(Debug, thiserror::Error)]
pub enum ShelfError {
    #[error("{0}")]
    Validation(String),

    #[error("sign in required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid file reference: {0}")]
    InvalidReference(String),

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("{0}")]
    Conflict(String),

    #[error("storage fault: {0}")]
    StorageFault(String),
}

/// JSON body returned for every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub kind: String,
    pub message: String,
}

impl ShelfError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ShelfError::Validation(_) => "validation_error",
            ShelfError::Unauthorized => "unauthorized",
            ShelfError::Forbidden(_) => "forbidden",
            ShelfError::NotFound(_) => "not_found",
            ShelfError::InvalidReference(_) => "invalid_reference",
            ShelfError::UnsupportedMediaType(_) => "unsupported_media_type",
            ShelfError::Conflict(_) => "conflict",
            ShelfError::StorageFault(_) => "storage_fault",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ShelfError::Validation(_) | ShelfError::InvalidReference(_) => StatusCode::BAD_REQUEST,
            ShelfError::Unauthorized => StatusCode::UNAUTHORIZED,
            ShelfError::Forbidden(_) => StatusCode::FORBIDDEN,
            ShelfError::NotFound(_) => StatusCode::NOT_FOUND,
            ShelfError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ShelfError::Conflict(_) => StatusCode::CONFLICT,
            ShelfError::StorageFault(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// What the caller gets to see. Storage details stay in the log.
    pub fn body(&self) -> ErrorBody {
        let message = match self {
            ShelfError::StorageFault(_) => "the document store is unavailable".to_string(),
            other => other.to_string(),
        };

        ErrorBody {
            kind: self.kind().to_string(),
            message,
        }
    }
}

impl From<sqlx::Error> for ShelfError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ShelfError::NotFound("record".to_string()),
            other => ShelfError::StorageFault(format!("catalog: {}", other)),
        }
    }
}

impl From<BlobStoreError> for ShelfError {
    fn from(err: BlobStoreError) -> Self {
        match err {
            BlobStoreError::NotFound(_) => ShelfError::NotFound("file".to_string()),
            BlobStoreError::InvalidReference(id) => ShelfError::InvalidReference(id),
            other => ShelfError::StorageFault(format!("blob store: {}", other)),
        }
    }
}

impl IntoResponse for ShelfError {
    fn into_response(self) -> Response {
        match &self {
            ShelfError::StorageFault(detail) => tracing::error!(%detail, "storage fault"),
            ShelfError::NotFound(what) => tracing::debug!(%what, "not found"),
            other => tracing::debug!(kind = other.kind(), error = %other, "request rejected"),
        }

        (self.status(), Json(self.body())).into_response()
    }
}
