//! Lumina - Main Entry Point
//!
//! Tabular analytics service with CLI and server modes.

use clap::Parser;
use lumina::cli::{cmd_clean, cmd_describe, cmd_predict, cmd_serve, cmd_train, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lumina=info".into()),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, host } => {
            cmd_serve(host, port).await?;
        }
        Commands::Clean { data, output } => {
            cmd_clean(&data, output.as_deref())?;
        }
        Commands::Train { data, target, models_dir, test_size, n_estimators, seed } => {
            cmd_train(&data, target.as_deref(), &models_dir, test_size, n_estimators, seed)?;
        }
        Commands::Predict { data, models_dir, output } => {
            cmd_predict(&data, &models_dir, output.as_deref())?;
        }
        Commands::Describe { data } => {
            cmd_describe(&data)?;
        }
    }

    Ok(())
}
