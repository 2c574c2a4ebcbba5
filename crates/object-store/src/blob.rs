//! Public blob types: identifiers, metadata and the read handle.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use futures::stream::BoxStream;
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{BlobStoreError, Result};

/// Store-generated blob identifier.
///
/// Blobs are addressed by id rather than filename: filenames collide and
/// may carry characters that are unsafe in paths or headers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(Uuid);

impl BlobId {
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl FromStr for BlobId {
    type Err = BlobStoreError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| BlobStoreError::InvalidReference(s.to_string()))
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for BlobId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Caller-supplied metadata kept alongside a blob.
///
/// The store never interprets these fields; they are persisted as a JSON
/// document and handed back untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobMetadata {
    pub content_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    #[serde(flatten, default)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl BlobMetadata {
    pub fn new(content_type: impl Into<String>, uploaded_by: Option<String>) -> Self {
        Self {
            content_type: content_type.into(),
            uploaded_by,
            uploaded_at: Utc::now(),
            extra: BTreeMap::new(),
        }
    }
}

/// Index entry for a committed blob.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlobRecord {
    pub id: BlobId,
    pub filename: String,
    pub length: u64,
    pub metadata: BlobMetadata,
}

/// A blob opened for reading.
pub struct Blob {
    pub record: BlobRecord,
    /// Byte count reported by the object backend for the stored object.
    pub length: u64,
    pub stream: BoxStream<'static, Result<Bytes>>,
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Blob")
            .field("record", &self.record)
            .field("length", &self.length)
            .finish_non_exhaustive()
    }
}

impl Blob {
    /// Drain the stream into memory, checking the byte count on the way out.
    pub async fn into_bytes(self) -> Result<Bytes> {
        let Blob {
            record,
            length,
            mut stream,
        } = self;

        let mut buf = BytesMut::with_capacity(length as usize);
        while let Some(chunk) = stream.try_next().await? {
            buf.extend_from_slice(&chunk);
        }

        let actual = buf.len() as u64;
        if actual != length {
            return Err(BlobStoreError::LengthMismatch {
                id: record.id.to_string(),
                expected: length,
                actual,
            });
        }

        Ok(buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_id_parse() {
        let id = BlobId::generate();
        let parsed: BlobId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);

        let err = "not-an-id".parse::<BlobId>().unwrap_err();
        assert!(matches!(err, BlobStoreError::InvalidReference(_)));
    }

    #[test]
    fn test_metadata_keeps_extra_fields() {
        let json = r#"{
            "contentType": "application/pdf",
            "uploadedBy": "admin@example.com",
            "uploadedAt": "2025-01-01T00:00:00Z",
            "source": "scanner"
        }"#;
        let meta: BlobMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta.content_type, "application/pdf");
        assert_eq!(meta.extra.get("source").unwrap(), "scanner");

        let back = serde_json::to_value(&meta).unwrap();
        assert_eq!(back["source"], "scanner");
        assert_eq!(back["contentType"], "application/pdf");
    }
}
