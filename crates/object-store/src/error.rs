//! Error types for the blob store.

/// Errors that can occur when working with the blob store.
#[derive(Debug, thiserror::Error)]
pub enum BlobStoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Object storage error
    #[error("object storage error: {0}")]
    ObjectStore(#[from] object_store::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Migration error
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Metadata column could not be (de)serialized
    #[error("metadata encoding error: {0}")]
    Metadata(#[from] serde_json::Error),

    /// Blob id is not well-formed
    #[error("invalid blob reference: {0}")]
    InvalidReference(String),

    /// Blob not found
    #[error("blob not found: {0}")]
    NotFound(String),

    /// Bytes read back differ in length from what the backend reported
    #[error("blob {id} length mismatch: expected {expected} bytes, read {actual}")]
    LengthMismatch {
        id: String,
        expected: u64,
        actual: u64,
    },

    /// Invalid configuration
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// S3 bucket not found - must be created before use
    #[error("S3 bucket '{0}' does not exist. Create it before starting the service.")]
    BucketNotFound(String),
}

impl BlobStoreError {
    /// True for outcomes a caller should treat as "the blob is simply absent".
    pub fn is_not_found(&self) -> bool {
        matches!(self, BlobStoreError::NotFound(_))
    }
}

/// Result type alias for blob store operations.
pub type Result<T> = std::result::Result<T, BlobStoreError>;
