use std::path::Path;

use blob_store::{BlobStore, BlobStoreError, ObjectStoreConfig};

use crate::database::{Database, DatabaseSetupError};
use crate::service_config::Config;
use crate::state::BlobStoreConfig;

const BLOB_INDEX_FILE_NAME: &str = "blob-index.sqlite";

/// Process-wide handles, built once at start-up and cloned into every request.
#[derive(Clone, Debug)]
pub struct State {
    database: Database,
    blobs: BlobStore,
}

impl State {
    pub fn new(database: Database, blobs: BlobStore) -> Self {
        Self { database, blobs }
    }

    pub async fn from_config(config: &Config) -> Result<Self, StateSetupError> {
        let database = match &config.sqlite_path {
            Some(path) => {
                let url = url::Url::parse(&format!("sqlite://{}", path.display()))
                    .map_err(|e| StateSetupError::InvalidDatabaseUrl(e.to_string()))?;
                Database::connect(&url).await?
            }
            None => Database::in_memory().await?,
        };
        tracing::info!(path = ?config.sqlite_path, "catalog ready");

        let blobs = open_blob_store(&config.blob_store, &config.shelf_dir).await?;

        // Anything half-written before the last shutdown is dropped here
        let swept = blobs.sweep_incomplete().await?;
        if swept > 0 {
            tracing::warn!(swept, "removed blobs from interrupted uploads");
        }

        Ok(Self { database, blobs })
    }

    /// Fresh in-memory catalog and blob store.
    pub async fn ephemeral() -> Result<Self, StateSetupError> {
        Ok(Self {
            database: Database::in_memory().await?,
            blobs: BlobStore::new_ephemeral().await?,
        })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn blobs(&self) -> &BlobStore {
        &self.blobs
    }
}

async fn open_blob_store(
    config: &BlobStoreConfig,
    shelf_dir: &Path,
) -> Result<BlobStore, BlobStoreError> {
    match config {
        BlobStoreConfig::Memory => {
            tracing::warn!("using in-memory blob store, uploads will not survive a restart");
            BlobStore::new_ephemeral().await
        }
        BlobStoreConfig::Filesystem { path } => {
            let root = path.clone().unwrap_or_else(|| shelf_dir.join("blobs"));
            tracing::info!(root = %root.display(), "using filesystem blob store");
            BlobStore::new_local(&root).await
        }
        BlobStoreConfig::S3 {
            endpoint,
            access_key,
            secret_key,
            bucket,
            region,
        } => {
            tracing::info!(%endpoint, %bucket, "using S3 blob store");
            let object_config = ObjectStoreConfig::S3 {
                endpoint: endpoint.clone(),
                access_key: access_key.clone(),
                secret_key: secret_key.clone(),
                bucket: bucket.clone(),
                region: region.clone(),
            };
            BlobStore::new(&shelf_dir.join(BLOB_INDEX_FILE_NAME), object_config).await
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateSetupError {
    #[error("failed to setup the database: {0}")]
    DatabaseSetupError(#[from] DatabaseSetupError),

    #[error("invalid database url: {0}")]
    InvalidDatabaseUrl(String),

    #[error("failed to setup the blob store: {0}")]
    BlobStoreSetupError(#[from] BlobStoreError),
}
