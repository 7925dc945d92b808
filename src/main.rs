//! # ERP Bridge Entry Point
//!
//! ```bash
//! erp-bridge            # run migrations, then serve
//! erp-bridge serve
//! erp-bridge migrate    # apply migrations and exit
//! ```

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use erp_bridge::{config::ConfigLoader, db, server::run_server, telemetry};

#[derive(Parser)]
#[command(name = "erp-bridge")]
#[command(version, about = "Nuvemshop ERP bridge")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply migrations and start the HTTP server
    Serve,
    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("loading configuration")?;
    telemetry::init_tracing(&config)?;

    match config.redacted_json() {
        Ok(redacted) => tracing::debug!(config = %redacted, "Loaded configuration"),
        Err(err) => tracing::warn!(error = %err, "Could not render configuration"),
    }
    tracing::info!(profile = %config.profile, "Configuration loaded");

    let pool = db::init_pool(&config)
        .await
        .context("initializing database connection pool")?;
    db::run_migrations(&pool).await?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Migrate => Ok(()),
        Commands::Serve => run_server(Arc::new(config), pool).await,
    }
}
