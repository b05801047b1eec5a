#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! CLI entry point for the riskgrid analysis toolchain.

mod config;
mod pipeline;
mod progress;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::RunConfig;

#[derive(Parser)]
#[command(name = "riskgrid_cli", about = "Grid-based crime risk analysis pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download all registered datasets for the configured years
    Fetch {
        /// Maximum number of records per point source (for testing)
        #[arg(long)]
        limit: Option<u64>,
        /// Path to a TOML run configuration overriding the default
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Run the analysis from previously fetched raw files
    Run {
        /// Path to a TOML run configuration overriding the default
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Fetch everything, then run the analysis
    Pipeline {
        /// Maximum number of records per point source (for testing)
        #[arg(long)]
        limit: Option<u64>,
        /// Path to a TOML run configuration overriding the default
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List all registered data sources
    Sources,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = progress::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { limit, config } => {
            let config = RunConfig::load(config.as_deref())?;
            pipeline::fetch_all(&config, limit, &multi).await?;
        }
        Commands::Run { config } => {
            let config = RunConfig::load(config.as_deref())?;
            pipeline::run_analysis(&config)?;
        }
        Commands::Pipeline { limit, config } => {
            let config = RunConfig::load(config.as_deref())?;
            pipeline::fetch_all(&config, limit, &multi).await?;
            pipeline::run_analysis(&config)?;
        }
        Commands::Sources => {
            println!("Point sources:");
            for source in riskgrid_source::registry::point_sources() {
                println!("  {} \u{2014} {}", source.id, source.name);
            }
            println!("Boundary layers:");
            for source in riskgrid_source::registry::boundary_sources() {
                println!("  {} \u{2014} {}", source.id, source.name);
            }
        }
    }

    Ok(())
}
