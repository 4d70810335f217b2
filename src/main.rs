use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod hub;
mod recipe;
mod report;
mod resolver;
mod util;
mod version;

#[derive(Parser)]
#[command(name = "skillbump", version)]
#[command(about = "Check skill recipes against upstream and bump them in place", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve one package against upstream and update its recipe on change
    Resolve {
        /// Package name (locates <recipes-dir>/<package>/recipe.yaml)
        package: String,

        /// Update strategy: track-latest-commit, track-latest-release, track-content-hash
        strategy: String,

        /// Path to config file (defaults to ./skillbump.toml or ~/.config/skillbump/config.toml)
        #[arg(long)]
        config: Option<String>,

        /// Override the recipes root directory
        #[arg(long)]
        recipes_dir: Option<String>,

        /// Probe upstream and report, but never write the recipe
        #[arg(long)]
        dry_run: bool,
    },

    /// List packages that have a recipe descriptor
    List {
        /// Path to config file
        #[arg(long)]
        config: Option<String>,

        /// Override the recipes root directory
        #[arg(long)]
        recipes_dir: Option<String>,
    },

    /// Validate the effective configuration
    ConfigCheck {
        /// Path to config file
        #[arg(long)]
        config: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Resolve {
            package,
            strategy,
            config,
            recipes_dir,
            dry_run,
        } => {
            cli::resolve::run(package, strategy, config, recipes_dir, dry_run).await?;
        }
        Commands::List {
            config,
            recipes_dir,
        } => {
            cli::list::run(config, recipes_dir)?;
        }
        Commands::ConfigCheck { config } => {
            cli::config_check::run(config)?;
        }
    }

    Ok(())
}
