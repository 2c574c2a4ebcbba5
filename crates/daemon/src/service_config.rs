use std::net::SocketAddr;
use std::path::PathBuf;

use crate::state::BlobStoreConfig;

#[derive(Debug, Clone)]
pub struct Config {
    // blob store configuration
    /// Blob storage backend configuration
    pub blob_store: BlobStoreConfig,
    /// Path to the data directory (absolute path, default home for blobs)
    pub shelf_dir: PathBuf,

    // http server configuration
    /// Address the API server listens on
    pub listen_addr: SocketAddr,
    /// Largest accepted request body, in bytes
    pub max_upload_bytes: usize,

    // data store configuration
    /// a path to a sqlite database, if not set then an
    ///  in-memory database will be used
    pub sqlite_path: Option<PathBuf>,

    // logging
    pub log_level: tracing::Level,
    /// Directory for log files (optional, logs to stdout only if not set)
    pub log_dir: Option<PathBuf>,
}
