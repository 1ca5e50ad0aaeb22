#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line entry point for the crash injury pipeline.
//!
//! With a subcommand, runs that single step. Without one, shows an
//! interactive menu. Logging goes through
//! [`crash_injury_cli_utils::init_logger`] so log lines and progress bars
//! share the terminal.

mod config;
mod interactive;
mod pipeline;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::PipelineConfig;

#[derive(Parser)]
#[command(
    name = "crash_injury",
    about = "Explore traffic crashes and model whether they involve injuries"
)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the registered crash datasets
    Datasets,
    /// Print the effective configuration as TOML
    Config,
    /// Fetch raw crash rows and save them as JSON
    Fetch {
        /// Where to write the raw rows
        #[arg(long)]
        output: PathBuf,
        /// Maximum number of rows to fetch
        #[arg(long)]
        limit: Option<u64>,
        /// Look back this many years instead of the configured value
        #[arg(long)]
        years: Option<u32>,
    },
    /// Render the exploratory charts
    Explore {
        /// Raw JSON dump to use instead of fetching
        #[arg(long)]
        input: Option<PathBuf>,
    },
    /// Cross-validate, fit and evaluate the injury model
    Train {
        /// Raw JSON dump to use instead of fetching
        #[arg(long)]
        input: Option<PathBuf>,
        /// Where to save the fitted model (defaults to the output directory)
        #[arg(long)]
        model: Option<PathBuf>,
    },
    /// Score crash rows with a saved model
    Predict {
        /// Model artifact written by `train`
        #[arg(long)]
        model: PathBuf,
        /// Raw JSON rows to score
        #[arg(long)]
        input: PathBuf,
    },
    /// Fetch, explore and train in one go
    Run {
        /// Maximum number of rows to fetch
        #[arg(long)]
        limit: Option<u64>,
        /// Raw JSON dump to use instead of fetching
        #[arg(long)]
        input: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = crash_injury_cli_utils::init_logger();
    let cli = Cli::parse();
    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    let Some(command) = cli.command else {
        return interactive::run(&config, &multi).await;
    };

    match command {
        Commands::Datasets => pipeline::list_datasets(),
        Commands::Config => println!("{}", config.to_toml()?),
        Commands::Fetch {
            output,
            limit,
            years,
        } => {
            if limit.is_some() {
                config.source.limit = limit;
            }
            if let Some(years) = years {
                config.source.lookback_years = years;
            }
            pipeline::fetch(&config.source, &output, &multi).await?;
        }
        Commands::Explore { input } => {
            let raw = pipeline::acquire(&config.source, input.as_deref(), &multi).await?;
            let records = pipeline::prepare(&raw);
            pipeline::explore(&records, &config.explore, &config.output_dir)?;
        }
        Commands::Train { input, model } => {
            let raw = pipeline::acquire(&config.source, input.as_deref(), &multi).await?;
            let records = pipeline::prepare(&raw);
            let saved = pipeline::train(&records, &config, model.as_deref(), &multi)?;
            println!("Model saved to {}", saved.display());
        }
        Commands::Predict { model, input } => {
            let raw = pipeline::acquire(&config.source, Some(&input), &multi).await?;
            let records = pipeline::prepare(&raw);
            pipeline::predict(&records, &model)?;
        }
        Commands::Run { limit, input } => {
            if limit.is_some() {
                config.source.limit = limit;
            }
            pipeline::run(&config, input.as_deref(), &multi).await?;
        }
    }

    Ok(())
}
