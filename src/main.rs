use anyhow::Context;
use clap::{Parser, Subcommand};
use configuration::{load_config, StoreBackend};
use std::path::PathBuf;

/// The main entry point for the donations service.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config =
        load_config(cli.config.as_deref(), cli.backend).context("Failed to load configuration")?;

    // Keep the guard alive so buffered file logs are flushed on exit.
    let _log_guard = configuration::init_tracing(&config.logging)?;

    match cli.command {
        Commands::Serve => {
            let store = database::open_store(&config.database).await?;
            web_server::run_server(&config.server, store).await?;
        }
        Commands::InitDb => {
            let store = database::open_store(&config.database).await?;
            store
                .reinitialize()
                .await
                .context("Failed to reinitialize the schema")?;
            store.close().await;
            tracing::info!("Database initialized.");
        }
    }

    Ok(())
}

// ==============================================================================
// CLI Structure
// ==============================================================================

/// An HTTP JSON API over the charity, recipient and food donation tables.
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to a TOML configuration file. Defaults to `config.toml` when present.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `database.backend` from the configuration.
    #[arg(long, global = true, value_enum)]
    backend: Option<StoreBackend>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP server.
    Serve,
    /// Drop every table and replay the schema script, then exit.
    InitDb,
}
