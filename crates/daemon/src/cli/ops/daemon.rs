use std::net::{IpAddr, SocketAddr};

use clap::Args;

use studyshelf::state::AppState;
use studyshelf::{spawn_service, ServiceConfig};

const BYTES_PER_MB: usize = 1024 * 1024;

#[derive(Args, Debug, Clone)]
pub struct Daemon {
    /// Override API server port (default from config)
    #[arg(long)]
    pub api_port: Option<u16>,

    /// Override the interface to bind (default from config)
    #[arg(long)]
    pub listen_host: Option<String>,

    /// Directory for log files (logs to stdout only if not set)
    #[arg(long)]
    pub log_dir: Option<std::path::PathBuf>,

    /// Default log level when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,
}

#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    #[error("state error: {0}")]
    StateError(#[from] studyshelf::state::StateError),

    #[error("invalid listen host: {0}")]
    ListenHost(String),
}

#[async_trait::async_trait]
impl crate::cli::op::Op for Daemon {
    type Error = DaemonError;
    type Output = String;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
        let state = AppState::load(ctx.config_path.clone())?;

        let host = self
            .listen_host
            .clone()
            .unwrap_or_else(|| state.config.listen_host.clone());
        let ip: IpAddr = host
            .parse()
            .map_err(|_| DaemonError::ListenHost(host.clone()))?;
        let port = self.api_port.unwrap_or(state.config.api_port);

        let config = ServiceConfig {
            blob_store: state.config.blob_store.clone(),
            shelf_dir: state.shelf_dir.clone(),
            listen_addr: SocketAddr::new(ip, port),
            max_upload_bytes: state.config.max_upload_mb.saturating_mul(BYTES_PER_MB),
            sqlite_path: Some(state.db_path),
            log_level: self.log_level,
            log_dir: self.log_dir.clone(),
        };

        spawn_service(&config).await;
        Ok("service stopped".to_string())
    }
}
