//! The blob store: SQLite index in front of object storage.

use std::path::Path;

use bytes::Bytes;

use crate::blob::{Blob, BlobId, BlobMetadata, BlobRecord};
use crate::database::{BlobRow, Database};
use crate::error::{BlobStoreError, Result};
use crate::storage::{ObjectStoreConfig, Storage};

const INDEX_FILE_NAME: &str = "blobs.db";
const OBJECTS_DIR_NAME: &str = "objects";

/// Durable binary storage keyed by generated ids.
///
/// Writes go through a two-step commit: an index row is reserved as
/// `partial`, the bytes are written to object storage, then the row is
/// flipped to `complete`. Readers only ever see complete rows, so a crash
/// or backend failure mid-upload never produces a visible blob.
#[derive(Debug, Clone)]
pub struct BlobStore {
    db: Database,
    storage: Storage,
}

impl BlobStore {
    /// Create a store with its index at `db_path` and objects in `config`.
    pub async fn new(db_path: &Path, config: ObjectStoreConfig) -> Result<Self> {
        let db = Database::new(db_path).await?;
        let storage = Storage::new(config).await?;
        Ok(Self { db, storage })
    }

    /// Create a store rooted at a local directory.
    pub async fn new_local(root: &Path) -> Result<Self> {
        let config = ObjectStoreConfig::Local {
            path: root.join(OBJECTS_DIR_NAME),
        };
        Self::new(&root.join(INDEX_FILE_NAME), config).await
    }

    /// Create a fully in-memory store.
    pub async fn new_ephemeral() -> Result<Self> {
        let db = Database::in_memory().await?;
        let storage = Storage::new(ObjectStoreConfig::Memory).await?;
        Ok(Self { db, storage })
    }

    /// Store `data` and return its new id.
    ///
    /// Once this returns `Ok`, the blob is complete and readable.
    pub async fn put(&self, data: Bytes, filename: &str, metadata: BlobMetadata) -> Result<BlobId> {
        let id = BlobId::generate();
        let key = id.to_string();
        let length = data.len() as i64;
        let metadata_json = serde_json::to_string(&metadata)?;

        self.db.insert_partial(&key, filename, &metadata_json).await?;

        if let Err(e) = self.storage.put_data(&key, data).await {
            tracing::error!(blob_id = %key, error = %e, "blob write failed, discarding partial upload");
            self.discard(&key).await;
            return Err(e);
        }

        if !self.db.mark_complete(&key, length).await? {
            // Row vanished under us (sweep raced the upload)
            self.discard(&key).await;
            return Err(BlobStoreError::NotFound(key));
        }

        tracing::debug!(blob_id = %key, filename, length, "blob committed");
        Ok(id)
    }

    /// Open a blob for reading.
    pub async fn get(&self, id: &BlobId) -> Result<Blob> {
        let record = self.head(id).await?;
        let key = id.to_string();

        match self.storage.get_stream(&key).await? {
            Some((length, stream)) => Ok(Blob {
                record,
                length,
                stream,
            }),
            None => {
                tracing::warn!(blob_id = %key, "index row has no backing object");
                Err(BlobStoreError::NotFound(key))
            }
        }
    }

    /// Look up a blob's index record without touching its bytes.
    pub async fn head(&self, id: &BlobId) -> Result<BlobRecord> {
        let key = id.to_string();
        let row = self
            .db
            .get_complete(&key)
            .await?
            .ok_or(BlobStoreError::NotFound(key))?;
        Self::to_record(row)
    }

    /// Delete a blob by id.
    ///
    /// Not idempotent: deleting an id that is absent (or already being
    /// deleted by someone else) fails with `NotFound`.
    pub async fn delete(&self, id: &BlobId) -> Result<()> {
        let key = id.to_string();
        if !self.db.mark_deleting(&key).await? {
            return Err(BlobStoreError::NotFound(key));
        }

        self.storage.delete_data(&key).await?;
        self.db.delete_blob(&key).await?;
        tracing::debug!(blob_id = %key, "blob deleted");
        Ok(())
    }

    /// List every complete blob, newest first.
    pub async fn list(&self) -> Result<Vec<BlobRecord>> {
        self.db
            .list_complete()
            .await?
            .into_iter()
            .map(Self::to_record)
            .collect()
    }

    /// Remove rows (and any objects) left behind by interrupted uploads or deletes.
    ///
    /// Meant to run once at start-up, before any uploads are accepted.
    pub async fn sweep_incomplete(&self) -> Result<usize> {
        let ids = self.db.list_incomplete().await?;
        let mut swept = 0;
        for id in ids {
            self.storage.delete_data(&id).await?;
            if self.db.delete_blob(&id).await? {
                swept += 1;
            }
        }
        if swept > 0 {
            tracing::info!(swept, "removed incomplete blobs");
        }
        Ok(swept)
    }

    /// Readiness probe for the index.
    pub async fn is_ready(&self) -> Result<()> {
        self.db.ping().await
    }

    async fn discard(&self, key: &str) {
        if let Err(e) = self.storage.delete_data(key).await {
            tracing::warn!(blob_id = %key, error = %e, "failed to remove partial object");
        }
        if let Err(e) = self.db.delete_blob(key).await {
            tracing::warn!(blob_id = %key, error = %e, "failed to remove partial index row");
        }
    }

    fn to_record(row: BlobRow) -> Result<BlobRecord> {
        Ok(BlobRecord {
            id: row.id.parse()?,
            filename: row.filename,
            length: row.length as u64,
            metadata: serde_json::from_str(&row.metadata)?,
        })
    }
}

#[cfg(test)]
impl BlobStore {
    fn with_parts(db: Database, storage: Storage) -> Self {
        Self { db, storage }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use object_store::local::LocalFileSystem;

    use super::*;

    fn pdf_meta() -> BlobMetadata {
        BlobMetadata::new("application/pdf", Some("admin@example.com".to_string()))
    }

    #[tokio::test]
    async fn test_put_get_round_trip() {
        let store = BlobStore::new_ephemeral().await.unwrap();
        let payload: Vec<u8> = (0u8..=255).cycle().take(70_000).collect();

        let id = store
            .put(Bytes::from(payload.clone()), "algebra.pdf", pdf_meta())
            .await
            .unwrap();

        let blob = store.get(&id).await.unwrap();
        assert_eq!(blob.length, payload.len() as u64);
        assert_eq!(blob.record.filename, "algebra.pdf");
        assert_eq!(blob.record.length, payload.len() as u64);
        assert_eq!(blob.record.metadata.content_type, "application/pdf");

        let bytes = blob.into_bytes().await.unwrap();
        assert_eq!(bytes.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn test_empty_blob_round_trip() {
        let store = BlobStore::new_ephemeral().await.unwrap();
        let id = store.put(Bytes::new(), "empty.bin", pdf_meta()).await.unwrap();
        let bytes = store.get(&id).await.unwrap().into_bytes().await.unwrap();
        assert!(bytes.is_empty());
    }

    #[tokio::test]
    async fn test_get_unknown_id_is_not_found() {
        let store = BlobStore::new_ephemeral().await.unwrap();
        let id: BlobId = "7d444840-9dc0-11d1-b245-5ffdce74fad2".parse().unwrap();
        let err = store.get(&id).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_second_delete_fails() {
        let store = BlobStore::new_ephemeral().await.unwrap();
        let id = store
            .put(Bytes::from_static(b"bytes"), "a.pdf", pdf_meta())
            .await
            .unwrap();

        store.delete(&id).await.unwrap();
        assert!(store.get(&id).await.unwrap_err().is_not_found());
        assert!(store.delete(&id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_record() {
        // A regular file as the storage root makes every object write fail
        let temp_dir = tempfile::tempdir().unwrap();
        let not_a_dir = temp_dir.path().join("blocker");
        std::fs::write(&not_a_dir, b"x").unwrap();
        let backend = LocalFileSystem::new_with_prefix(&not_a_dir).unwrap();

        let db = Database::in_memory().await.unwrap();
        let store = BlobStore::with_parts(db.clone(), Storage::from_store(Arc::new(backend)));

        let result = store
            .put(Bytes::from_static(b"hello"), "a.pdf", pdf_meta())
            .await;
        assert!(result.is_err());
        assert!(store.list().await.unwrap().is_empty());
        assert!(db.list_incomplete().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sweep_removes_partial_rows() {
        let db = Database::in_memory().await.unwrap();
        let storage = Storage::new(ObjectStoreConfig::Memory).await.unwrap();
        let store = BlobStore::with_parts(db.clone(), storage.clone());

        // Simulate an upload that died after writing its object
        db.insert_partial("dead-upload", "x.pdf", "{}").await.unwrap();
        storage
            .put_data("dead-upload", Bytes::from_static(b"half"))
            .await
            .unwrap();

        let kept = store
            .put(Bytes::from_static(b"kept"), "kept.pdf", pdf_meta())
            .await
            .unwrap();

        assert_eq!(store.sweep_incomplete().await.unwrap(), 1);
        assert!(!storage.has_data("dead-upload").await.unwrap());
        assert!(db.get_any("dead-upload").await.unwrap().is_none());
        assert!(store.get(&kept).await.is_ok());
    }

    #[tokio::test]
    async fn test_local_store_persists_across_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();

        let id = {
            let store = BlobStore::new_local(temp_dir.path()).await.unwrap();
            store
                .put(Bytes::from_static(b"persisted"), "p.pdf", pdf_meta())
                .await
                .unwrap()
        };

        let store = BlobStore::new_local(temp_dir.path()).await.unwrap();
        let bytes = store.get(&id).await.unwrap().into_bytes().await.unwrap();
        assert_eq!(bytes.as_ref(), b"persisted");
        assert_eq!(store.list().await.unwrap().len(), 1);
    }
}
