use std::error::Error;
use std::path::PathBuf;

use url::Url;

use studyshelf::http_server::api::client::{ApiClient, ApiError};
use studyshelf::state::AppState;
use studyshelf::Principal;

const DEFAULT_REMOTE: &str = "http://localhost:5050";

/// Resolve the remote URL for the API client.
///
/// Priority: explicit `--remote` flag > config file `api_port` > 5050.
pub fn resolve_remote(explicit: Option<Url>, config_path: Option<PathBuf>) -> Result<Url, url::ParseError> {
    if let Some(url) = explicit {
        return Ok(url);
    }
    if let Ok(state) = AppState::load(config_path) {
        if let Ok(url) = Url::parse(&format!("http://localhost:{}", state.config.api_port)) {
            return Ok(url);
        }
    }
    Url::parse(DEFAULT_REMOTE)
}

#[derive(Clone)]
pub struct OpContext {
    /// API client (always initialized with default or custom URL)
    pub client: ApiClient,
    /// Optional custom config path (defaults to ~/.studyshelf)
    pub config_path: Option<PathBuf>,
}

impl OpContext {
    /// Create context with custom remote URL, optional config path and
    /// optional principal to present to the server.
    pub fn new(
        remote: Url,
        config_path: Option<PathBuf>,
        principal: Option<Principal>,
    ) -> Result<Self, ApiError> {
        let client = match principal {
            Some(principal) => ApiClient::with_principal(&remote, &principal)?,
            None => ApiClient::new(&remote)?,
        };
        Ok(Self {
            client,
            config_path,
        })
    }
}

#[async_trait::async_trait]
pub trait Op: Send + Sync {
    type Error: Error + Send + Sync + 'static;
    type Output;

    async fn execute(&self, ctx: &OpContext) -> Result<Self::Output, Self::Error>;
}

#[macro_export]
macro_rules! command_enum {
    ($(($variant:ident, $type:ty)),* $(,)?) => {
        #[derive(Subcommand, Debug, Clone)]
        pub enum Command {
            $($variant($type),)*
        }

        #[derive(Debug)]
        pub enum OpOutput {
            $($variant(<$type as $crate::cli::op::Op>::Output),)*
        }

        #[derive(Debug, thiserror::Error)]
        pub enum OpError {
            $(
                #[error(transparent)]
                $variant(<$type as $crate::cli::op::Op>::Error),
            )*
        }

        #[async_trait::async_trait]
        impl $crate::cli::op::Op for Command {
            type Output = OpOutput;
            type Error = OpError;

            async fn execute(&self, ctx: &$crate::cli::op::OpContext) -> Result<Self::Output, Self::Error> {
                match self {
                    $(
                        Command::$variant(op) => {
                            op.execute(ctx).await
                                .map(OpOutput::$variant)
                                .map_err(OpError::$variant)
                        },
                    )*
                }
            }
        }

        impl std::fmt::Display for OpOutput {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        OpOutput::$variant(output) => write!(f, "{}", output),
                    )*
                }
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_remote_explicit_wins() {
        let explicit = Url::parse("http://example.com:9999").unwrap();
        let result = resolve_remote(Some(explicit.clone()), None).unwrap();
        assert_eq!(result, explicit);
    }

    #[test]
    fn test_resolve_remote_falls_back_to_default() {
        let result = resolve_remote(None, Some(PathBuf::from("/nonexistent"))).unwrap();
        assert_eq!(result.as_str(), "http://localhost:5050/");
    }

    #[test]
    fn test_resolve_remote_reads_config() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = studyshelf::AppConfig {
            api_port: 6123,
            ..Default::default()
        };
        AppState::init(Some(temp_dir.path().to_path_buf()), Some(config)).unwrap();

        let result = resolve_remote(None, Some(temp_dir.path().to_path_buf())).unwrap();
        assert_eq!(result.port(), Some(6123));
    }
}
