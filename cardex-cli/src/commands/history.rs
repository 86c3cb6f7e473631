//! History command - inspect the stored price history.

use anyhow::{Result, bail};
use cardex_core::CardId;
use cardex_store::{Config, SnapshotStore};
use clap::Args;
use std::path::PathBuf;

use crate::output::{CardHistoryOutput, HistoryStatsOutput, JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the history command.
#[derive(Args)]
pub struct HistoryArgs {
    /// Card to show; without it, prints overall history statistics.
    pub card_id: Option<CardId>,

    /// Show the wide view (one column per date).
    #[arg(long, conflicts_with = "card_id")]
    pub wide: bool,

    /// Data directory (overrides `storage.data_dir`).
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

/// Runs the history command.
pub async fn run(args: &HistoryArgs, cli: &Cli, config: &Config) -> Result<()> {
    let root = args
        .data_dir
        .clone()
        .unwrap_or_else(|| config.storage.data_dir.clone());
    let history = SnapshotStore::new(root).load_history().await?;

    let text = TextFormatter::new(!cli.no_color);
    let json = JsonFormatter::new(cli.pretty);

    if let Some(card_id) = args.card_id {
        let rows = history.for_card(card_id);
        if rows.is_empty() {
            bail!("No price history for card {card_id}");
        }
        let output = CardHistoryOutput::new(card_id, &rows);
        match cli.format {
            OutputFormat::Text => println!("{}", text.format_card_history(&output)),
            OutputFormat::Json => println!("{}", json.format(&output)?),
        }
    } else if args.wide {
        let wide = history.wide_view();
        match cli.format {
            OutputFormat::Text => println!("{}", text.format_wide(&wide)),
            OutputFormat::Json => println!("{}", json.format(&wide)?),
        }
    } else {
        let stats = HistoryStatsOutput::from_history(&history);
        match cli.format {
            OutputFormat::Text => println!("{}", text.format_history_stats(&stats)),
            OutputFormat::Json => println!("{}", json.format(&stats)?),
        }
    }

    Ok(())
}
