use std::{fs, path::PathBuf};

use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "studyshelf";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const DB_FILE_NAME: &str = "catalog.sqlite";
pub const BLOBS_DIR_NAME: &str = "blobs";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Port for the API server
    #[serde(default = "default_api_port")]
    pub api_port: u16,
    /// Interface the API server binds to
    #[serde(default = "default_listen_host")]
    pub listen_host: String,
    /// Largest accepted upload, in megabytes
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: usize,
    /// Where uploaded file bytes live
    #[serde(default)]
    pub blob_store: BlobStoreConfig,
}

fn default_api_port() -> u16 {
    5050
}

fn default_listen_host() -> String {
    "127.0.0.1".to_string()
}

fn default_max_upload_mb() -> usize {
    50
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_port: default_api_port(),
            listen_host: default_listen_host(),
            max_upload_mb: default_max_upload_mb(),
            blob_store: BlobStoreConfig::default(),
        }
    }
}

/// Configuration for the blob storage backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BlobStoreConfig {
    /// Nothing survives a restart; for demos and tests
    Memory,

    /// SQLite index + local filesystem objects
    Filesystem {
        /// Path for blob storage (defaults to shelf_dir/blobs/)
        path: Option<PathBuf>,
    },

    /// S3-compatible object storage
    S3 {
        /// S3 endpoint URL (e.g., "http://localhost:9000" for MinIO)
        endpoint: String,
        access_key: String,
        secret_key: String,
        bucket: String,
        /// Optional region (defaults to "us-east-1")
        region: Option<String>,
    },
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        BlobStoreConfig::Filesystem { path: None }
    }
}

#[derive(Debug, Clone)]
pub struct AppState {
    /// Path to the data directory (~/.studyshelf)
    pub shelf_dir: PathBuf,
    /// Path to the catalog database
    pub db_path: PathBuf,
    /// Path to the blobs directory
    pub blobs_path: PathBuf,
    /// Path to the config file
    pub config_path: PathBuf,
    /// Loaded configuration
    pub config: AppConfig,
}

impl AppState {
    /// Get the data directory path (custom or default ~/.studyshelf)
    pub fn shelf_dir(custom_path: Option<PathBuf>) -> Result<PathBuf, StateError> {
        if let Some(path) = custom_path {
            return Ok(path);
        }

        let home = dirs::home_dir().ok_or(StateError::NoHomeDirectory)?;
        Ok(home.join(format!(".{}", APP_NAME)))
    }

    /// Initialize a new data directory
    pub fn init(
        custom_path: Option<PathBuf>,
        config: Option<AppConfig>,
    ) -> Result<Self, StateError> {
        let shelf_dir = Self::shelf_dir(custom_path)?;

        if shelf_dir.join(CONFIG_FILE_NAME).exists() {
            return Err(StateError::AlreadyInitialized);
        }

        fs::create_dir_all(&shelf_dir)?;

        let blobs_path = shelf_dir.join(BLOBS_DIR_NAME);
        fs::create_dir_all(&blobs_path)?;

        let config = config.unwrap_or_default();
        let config_path = shelf_dir.join(CONFIG_FILE_NAME);
        let config_toml = toml::to_string_pretty(&config)?;
        fs::write(&config_path, config_toml)?;

        // The catalog schema is created by the service on first start
        let db_path = shelf_dir.join(DB_FILE_NAME);

        Ok(Self {
            shelf_dir,
            db_path,
            blobs_path,
            config_path,
            config,
        })
    }

    /// Load existing state from the data directory
    pub fn load(custom_path: Option<PathBuf>) -> Result<Self, StateError> {
        let shelf_dir = Self::shelf_dir(custom_path)?;

        if !shelf_dir.exists() {
            return Err(StateError::NotInitialized);
        }

        let db_path = shelf_dir.join(DB_FILE_NAME);
        let blobs_path = shelf_dir.join(BLOBS_DIR_NAME);
        let config_path = shelf_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Err(StateError::MissingFile(CONFIG_FILE_NAME.to_string()));
        }
        if !blobs_path.exists() {
            return Err(StateError::MissingFile(format!("{}/", BLOBS_DIR_NAME)));
        }

        let config_toml = fs::read_to_string(&config_path)?;
        let config: AppConfig = toml::from_str(&config_toml)?;

        Ok(Self {
            shelf_dir,
            db_path,
            blobs_path,
            config_path,
            config,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("data directory not initialized. Run 'shelf init' first")]
    NotInitialized,

    #[error("data directory already initialized")]
    AlreadyInitialized,

    #[error("no home directory found")]
    NoHomeDirectory,

    #[error("missing required file: {0}")]
    MissingFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),
}
