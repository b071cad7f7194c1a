use anyhow::Result;
use clap::Parser;
use log::info;

use intake_cli::cli::app::{Cli, Commands};
use intake_cli::cli::commands;

#[tokio::main]
async fn main() -> Result<()> {
    // Log to a file so the TUI screen stays clean (truncate on each run).
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open("intake-cli.log")?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .init();

    // Allow INTAKE_* overrides from a local .env file.
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    info!("Starting intake-cli");

    match cli.command {
        Commands::Start { template_id } => commands::start::run(template_id).await,
        Commands::Resume { token } => commands::resume::run(token).await,
        Commands::Templates => commands::templates::run().await,
        Commands::Config(config) => commands::config::run(config.command).await,
    }
}
