// Service modules
pub mod database;
pub mod error;
pub mod http_server;
pub mod library;
pub mod principal;
pub mod process;
pub mod service_config;
pub mod service_state;
pub mod version;

// App state (configuration, paths)
pub mod state;

// Re-exports for consumers (the CLI, integration tests)
pub use database::Database;
pub use error::ShelfError;
pub use principal::{Principal, Role};
pub use process::{spawn_service, start_service, ShutdownHandle};
pub use service_config::Config as ServiceConfig;
pub use service_state::State as ServiceState;
pub use state::{AppConfig, AppState, BlobStoreConfig, StateError};
