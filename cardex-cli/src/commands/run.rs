//! Run command - execute the price pipeline once.

use anyhow::Result;
use cardex_core::SystemClock;
use cardex_fetch::{ReqwestFetcher, TokioSleeper};
use cardex_store::{Config, Pipeline, PipelineSettings, SnapshotStore};
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, ExitCode, OutputFormat};

/// Arguments for the run command.
#[derive(Args, Default)]
pub struct RunArgs {
    /// Output directory (overrides `storage.data_dir`).
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Skip per-card price lookups and use embedded prices only.
    #[arg(long)]
    pub no_lookup: bool,
}

/// Applies command-line overrides to the loaded configuration.
fn effective_config(args: &RunArgs, config: &Config) -> Config {
    let mut config = config.clone();
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir.clone_from(dir);
    }
    if args.no_lookup {
        config.prices.per_card_lookup = false;
    }
    config
}

/// Runs the run command.
pub async fn run(args: &RunArgs, cli: &Cli, config: &Config) -> Result<()> {
    let config = effective_config(args, config);
    let http = ReqwestFetcher::with_options(config.timeout(), &config.api.user_agent)?;

    let pipeline = Pipeline::new(
        Arc::new(http),
        Arc::new(TokioSleeper),
        Arc::new(SystemClock),
        SnapshotStore::new(config.storage.data_dir.clone())
            .with_lock_stale_after(config.lock_stale_after()),
        PipelineSettings::from(&config),
    );

    let cancel = pipeline.cancel_flag();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            if record_interrupt(&cancel) {
                warn!("Second interrupt received, exiting now");
                std::process::exit(ExitCode::Cancelled as i32);
            }
            warn!("Interrupt received, stopping before the next set (press Ctrl-C again to exit now)");
        }
    });

    info!(data_dir = %config.storage.data_dir.display(), "Starting run");
    let report = pipeline.run().await?;

    match cli.format {
        OutputFormat::Text => {
            if !cli.quiet {
                let formatter = TextFormatter::new(!cli.no_color);
                println!("{}", formatter.format_report(&report));
            }
        }
        OutputFormat::Json => {
            let formatter = JsonFormatter::new(cli.pretty);
            println!("{}", formatter.format(&report)?);
        }
    }

    Ok(())
}

/// Raises the cancel flag; returns `true` if it was already raised.
fn record_interrupt(cancel: &AtomicBool) -> bool {
    cancel.swap(true, Ordering::SeqCst)
}
