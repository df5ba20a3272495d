use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use awm_cli::commands::{buckets, migrate};
use awm_cli::{Cli, Commands, Config, MigrateArgs};
use awm_client::Client;

const SOURCE_CLIENT_NAME: &str = "awm-source";
const DESTINATION_CLIENT_NAME: &str = "awm-destination";

fn source_client(config: &Config) -> Result<Client> {
    Client::new(
        &config.source_url,
        SOURCE_CLIENT_NAME,
        &config.hostname,
        config.timeout(),
    )
    .context("failed to create source client")
}

fn destination_client(config: &Config) -> Result<Client> {
    Client::new(
        &config.destination_url,
        DESTINATION_CLIENT_NAME,
        &config.destination_hostname,
        config.timeout(),
    )
    .context("failed to create destination client")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    let config = Config::load_from(cli.config.as_deref()).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Commands::Migrate(MigrateArgs::default())) {
        Commands::Migrate(args) => {
            let source = source_client(&config)?;
            let report = if args.dry_run {
                migrate::dry_run(&source, &config).await?
            } else {
                let destination = destination_client(&config)?;
                tracing::info!(
                    source = %source.base_url(),
                    destination = %destination.base_url(),
                    "starting migration"
                );
                migrate::run(&source, &destination, &config).await?
            };
            migrate::write_report(&mut io::stdout().lock(), &report)?;
        }
        Commands::Buckets => {
            let source = source_client(&config)?;
            buckets::run(&mut io::stdout().lock(), &source, source.hostname()).await?;
        }
    }

    Ok(())
}
