// CLI modules
mod cli;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Daemon, Health, Init, Reviewers, Version};
use studyshelf::Principal;

command_enum! {
    (Daemon, Daemon),
    (Health, Health),
    (Init, Init),
    (Reviewers, Reviewers),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Resolve remote URL: explicit flag > config api_port > 5050
    let remote = match cli::op::resolve_remote(args.remote, args.config_path.clone()) {
        Ok(remote) => remote,
        Err(e) => {
            eprintln!("Error: invalid remote URL: {}", e);
            std::process::exit(1);
        }
    };

    let principal = args.principal_id.map(|id| {
        let name = args.principal_name.unwrap_or_else(|| id.clone());
        Principal::new(id, name, args.principal_role)
    });

    let ctx = match cli::op::OpContext::new(remote, args.config_path, principal) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
