//! SQLite + Object Storage Blob Store
//!
//! Durable binary storage for uploaded files. Blob bytes live in pluggable
//! object storage (S3/MinIO, local filesystem, or memory) under the
//! `uploads/` namespace; a small SQLite index tracks each blob's filename,
//! length, caller-supplied metadata and commit state.
//!
//! # Guarantees
//!
//! - Ids are generated by the store and never reused.
//! - A blob is visible only after every byte has been written.
//! - Committed bytes never change; edits are delete + re-upload.
//! - Deleting an absent id fails with [`BlobStoreError::NotFound`].
//!
//! # Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use shelf_object_store::{BlobMetadata, BlobStore};
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), shelf_object_store::BlobStoreError> {
//! let store = BlobStore::new_local(Path::new("/tmp/shelf-blobs")).await?;
//!
//! let meta = BlobMetadata::new("application/pdf", Some("admin@example.com".into()));
//! let id = store.put(Bytes::from_static(b"%PDF-1.7"), "notes.pdf", meta).await?;
//!
//! let bytes = store.get(&id).await?.into_bytes().await?;
//! assert_eq!(bytes.as_ref(), b"%PDF-1.7");
//! # Ok(())
//! # }
//! ```

mod blob;
mod database;
mod error;
mod storage;
mod store;

pub use blob::{Blob, BlobId, BlobMetadata, BlobRecord};
pub use error::{BlobStoreError, Result};
pub use storage::ObjectStoreConfig;
pub use store::BlobStore;
