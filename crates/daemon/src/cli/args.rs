pub use clap::Parser;

use std::path::PathBuf;
use url::Url;

use studyshelf::Role;

#[derive(Parser, Debug)]
#[command(name = "shelf")]
#[command(about = "Run and talk to a studyshelf document library")]
pub struct Args {
    /// API server to talk to (defaults to localhost on the configured port)
    #[arg(long, global = true)]
    pub remote: Option<Url>,

    /// Path to the studyshelf data directory (defaults to ~/.studyshelf)
    #[arg(long, global = true)]
    pub config_path: Option<PathBuf>,

    /// Act as this principal, as the authenticating proxy would
    #[arg(long, global = true)]
    pub principal_id: Option<String>,

    /// Display name sent along with --principal-id
    #[arg(long, global = true)]
    pub principal_name: Option<String>,

    /// Role sent along with --principal-id
    #[arg(long, global = true, default_value = "student")]
    pub principal_role: Role,

    #[command(subcommand)]
    pub command: crate::Command,
}
