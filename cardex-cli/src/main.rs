// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Cardex CLI - collectible card price tracking from the command line.
//!
//! # Examples
//!
//! ```bash
//! # Run the pipeline (default command)
//! cardex
//!
//! # Run with embedded prices only, into a custom directory
//! cardex run --no-lookup --data-dir /srv/cards
//!
//! # JSON run report
//! cardex --format json --pretty
//!
//! # Price history of one card
//! cardex history 1234
//!
//! # Write the default configuration
//! cardex config init
//! ```

mod commands;
mod output;

use anyhow::Result;
use cardex_store::{Config, PipelineError, StoreError};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{config, history, run};

// ============================================================================
// CLI Definition
// ============================================================================

/// Cardex CLI - collectible card price tracking.
#[derive(Parser)]
#[command(name = "cardex")]
#[command(about = "Collectible card price tracking CLI")]
#[command(long_about = r#"
Cardex fetches the set catalog and every set's cards from the pricing
service, writes the latest snapshot and a dated archive, and keeps a
long-format price history with one row per card per day.

Examples:
  cardex                         # Run the pipeline
  cardex run --no-lookup         # Embedded prices only
  cardex --format json           # JSON run report
  cardex history 1234            # One card's price history
  cardex config init             # Write default configuration
"#)]
#[command(version)]
#[command(author = "Cardex Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, runs 'run' by default.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Configuration file (defaults to the user config directory).
    #[arg(long, short = 'c', global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (no logging, minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

impl Cli {
    /// Path of the configuration file in effect.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Run the price pipeline (default if no command specified).
    #[command(visible_alias = "r")]
    Run(run::RunArgs),

    /// Inspect the stored price history.
    #[command(visible_alias = "h")]
    History(history::HistoryArgs),

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// The set catalog could not be fetched.
    CatalogExhausted = 2,
    /// Another run holds the history lock.
    HistoryLocked = 3,
    /// Interrupted before writing.
    Cancelled = 4,
}

impl ExitCode {
    /// Maps a command failure to its exit code.
    pub fn for_error(error: &anyhow::Error) -> Self {
        if let Some(e) = error.downcast_ref::<PipelineError>() {
            return match e {
                PipelineError::Catalog(_) => ExitCode::CatalogExhausted,
                PipelineError::Cancelled => ExitCode::Cancelled,
                PipelineError::Store(StoreError::Locked(_)) => ExitCode::HistoryLocked,
                PipelineError::Store(_) => ExitCode::Error,
            };
        }
        match error.downcast_ref::<StoreError>() {
            Some(StoreError::Locked(_)) => ExitCode::HistoryLocked,
            _ => ExitCode::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool, level: &str) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("cardex=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("cardex={level},warn")))
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match Config::load_from(&cli.config_path()) {
        Ok(config) => config,
        Err(e) => {
            if !cli.quiet {
                eprintln!("Error: {e}");
            }
            std::process::exit(ExitCode::Error as i32);
        }
    };

    setup_logging(cli.verbose, cli.quiet, &config.log_level);

    let result = match &cli.command {
        Some(Commands::Run(args)) => run::run(args, &cli, &config).await,
        Some(Commands::History(args)) => history::run(args, &cli, &config).await,
        Some(Commands::Config(args)) => config::run(args, &cli, &config),
        None => run::run(&run::RunArgs::default(), &cli, &config).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            eprintln!("Error: {e:#}");
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    Ok(())
}
