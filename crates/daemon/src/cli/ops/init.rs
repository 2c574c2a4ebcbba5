use std::path::PathBuf;

use clap::{Args, ValueEnum};

use studyshelf::state::{AppConfig, AppState, BlobStoreConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BlobBackend {
    Memory,
    Filesystem,
    S3,
}

#[derive(Args, Debug, Clone)]
pub struct Init {
    /// API server port
    #[arg(long, default_value_t = 5050)]
    pub api_port: u16,

    /// Interface the API server binds to
    #[arg(long, default_value = "127.0.0.1")]
    pub listen_host: String,

    /// Largest accepted upload, in megabytes
    #[arg(long, default_value_t = 50)]
    pub max_upload_mb: usize,

    /// Where uploaded file bytes are kept
    #[arg(long, value_enum, default_value = "filesystem")]
    pub blob_store: BlobBackend,

    /// Filesystem backend: directory for blobs (defaults to <data dir>/blobs)
    #[arg(long)]
    pub blobs_path: Option<PathBuf>,

    /// S3 backend: endpoint URL
    #[arg(long, required_if_eq("blob_store", "s3"))]
    pub s3_endpoint: Option<String>,

    /// S3 backend: bucket name (must already exist)
    #[arg(long, required_if_eq("blob_store", "s3"))]
    pub s3_bucket: Option<String>,

    #[arg(long, required_if_eq("blob_store", "s3"))]
    pub s3_access_key: Option<String>,

    #[arg(long, required_if_eq("blob_store", "s3"))]
    pub s3_secret_key: Option<String>,

    #[arg(long)]
    pub s3_region: Option<String>,
}

impl Init {
    fn blob_store_config(&self) -> Result<BlobStoreConfig, InitError> {
        match self.blob_store {
            BlobBackend::Memory => Ok(BlobStoreConfig::Memory),
            BlobBackend::Filesystem => Ok(BlobStoreConfig::Filesystem {
                path: self.blobs_path.clone(),
            }),
            BlobBackend::S3 => {
                let missing = |flag: &str| InitError::MissingFlag(flag.to_string());
                Ok(BlobStoreConfig::S3 {
                    endpoint: self.s3_endpoint.clone().ok_or_else(|| missing("--s3-endpoint"))?,
                    access_key: self
                        .s3_access_key
                        .clone()
                        .ok_or_else(|| missing("--s3-access-key"))?,
                    secret_key: self
                        .s3_secret_key
                        .clone()
                        .ok_or_else(|| missing("--s3-secret-key"))?,
                    bucket: self.s3_bucket.clone().ok_or_else(|| missing("--s3-bucket"))?,
                    region: self.s3_region.clone(),
                })
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("init failed: {0}")]
    StateFailed(#[from] studyshelf::state::StateError),

    #[error("missing required flag {0}")]
    MissingFlag(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Init {
    type Error = InitError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let config = AppConfig {
            api_port: self.api_port,
            listen_host: self.listen_host.clone(),
            max_upload_mb: self.max_upload_mb,
            blob_store: self.blob_store_config()?,
        };

        let state = AppState::init(ctx.config_path.clone(), Some(config))?;

        let output = format!(
            "Initialized studyshelf directory at: {}\n\
             - Catalog: {}\n\
             - Blobs: {}\n\
             - Config: {}\n\
             - API listen address: {}:{}",
            state.shelf_dir.display(),
            state.db_path.display(),
            state.blobs_path.display(),
            state.config_path.display(),
            state.config.listen_host,
            state.config.api_port,
        );

        Ok(output)
    }
}
