mod run;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// drift - ordered, file-backed SQL schema migrations.
#[derive(Parser)]
#[command(name = "drift")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Root directory that migration file paths are resolved against.
    #[arg(short, long, default_value = ".", global = true)]
    pub context: String,

    /// Name of the migrations config file, relative to the context.
    #[arg(short, long, default_value = "migrations.yaml", global = true)]
    pub file: String,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Apply unapplied migrations, in list order.
    Up {
        /// Stop after applying this migration.
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Roll back applied migrations, in reverse list order.
    Down {
        /// Stop after rolling back this migration.
        #[arg(short, long)]
        target: Option<String>,
    },

    /// Show which migrations are applied and which are pending.
    Status,
}

impl Cli {
    /// Execute the CLI command.
    pub async fn execute(self) -> Result<()> {
        run::execute(self).await
    }
}
