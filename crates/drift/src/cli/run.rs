use std::path::PathBuf;

use anyhow::Result;
use console::style;
use tokio_util::sync::CancellationToken;
use tracing::info;

use drift_core::{Config, DirReader, Error, Runner};

use super::{Cli, Commands};

/// Load the config, resolve the provider and drive the requested run.
pub async fn execute(cli: Cli) -> Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .init();

    let context = PathBuf::from(&cli.context);
    let config_path = context.join(&cli.file);
    if !config_path.exists() {
        anyhow::bail!("Config file not found: {}", config_path.display());
    }

    info!("Loading configuration from {}", config_path.display());
    let config = Config::from_file(&config_path)?;

    let registry = drift_providers::default_registry();
    let provider = registry.resolve(&config.provider, &config.config)?;
    let reader = DirReader::new(&context);

    println!();
    println!(
        "  {} v{} ({})",
        style("drift").bold().cyan(),
        env!("CARGO_PKG_VERSION"),
        config.provider
    );
    println!();

    // A ctrl-c cancels between migrations via the token; racing the run
    // against the token also drops an in-flight statement, whose
    // uncommitted transaction then rolls back server-side.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let runner = Runner::new(provider.as_ref(), &reader).with_cancellation(cancel.clone());

    match cli.command {
        Commands::Up { target } => {
            let run = runner.apply(&config.migrations, target.as_deref());
            tokio::select! {
                result = run => result?,
                _ = cancel.cancelled() => return Err(Error::Interrupted.into()),
            }

            println!("  {} Migrations applied", style("✓").green());
            println!();
        }

        Commands::Down { target } => {
            let run = runner.rollback(&config.migrations, target.as_deref());
            tokio::select! {
                result = run => result?,
                _ = cancel.cancelled() => return Err(Error::Interrupted.into()),
            }

            println!("  {} Migrations rolled back", style("✓").green());
            println!();
        }

        Commands::Status => {
            let status = runner.status(&config.migrations).await?;

            if !status.applied.is_empty() {
                println!("  {} Applied:", style("✓").green());
                for record in &status.applied {
                    println!(
                        "    {} {} {} ({})",
                        style("✓").green(),
                        style(&record.name).cyan(),
                        style("at").dim(),
                        record.applied_at.format("%Y-%m-%d %H:%M:%S")
                    );
                }
            }

            if !status.pending.is_empty() {
                if !status.applied.is_empty() {
                    println!();
                }
                println!("  {} Pending:", style("○").yellow());
                for name in &status.pending {
                    println!("    {} {}", style("→").dim(), style(name).yellow());
                }
            }

            if !status.unknown.is_empty() {
                println!();
                println!("  {} In history but not in the list:", style("!").red());
                for record in &status.unknown {
                    println!("    {} {}", style("!").red(), record.name);
                }
            }

            println!();
            println!(
                "  {} {} applied, {} pending",
                style("ℹ").blue(),
                status.applied.len(),
                status.pending.len()
            );
            println!();
        }
    }

    Ok(())
}
