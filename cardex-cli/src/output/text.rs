//! Text output formatting with colors.

use cardex_core::{RunReport, SetOutcome, SetReport};
use cardex_store::{Config, WideView};
use std::path::Path;

use super::json::{CardHistoryOutput, HistoryStatsOutput};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Formats a run report: one line per set, then absent sets and totals.
    pub fn format_report(&self, report: &RunReport) -> String {
        let mut lines = Vec::new();

        lines.push(self.bold(&format!("Cardex run {}", report.run_date)));
        lines.push("─".repeat(50));

        for set in &report.sets {
            lines.push(self.format_set_line(set));
        }

        if !report.absent.is_empty() {
            lines.push(String::new());
            lines.push(self.bold("Absent from this run"));
            for set in &report.absent {
                lines.push(format!("  {} {}", self.dim(&format!("#{}", set.set_id)), set.set_name));
            }
        }

        lines.push(String::new());
        lines.push(format!(
            "Sets: {} succeeded, {} skipped, {} failed, {} new",
            self.green(&report.succeeded().count().to_string()),
            self.yellow(&report.skipped().count().to_string()),
            self.red(&report.failed().count().to_string()),
            report.new_sets().count(),
        ));
        lines.push(format!(
            "Snapshot: {} cards{}",
            report.snapshot_cards,
            if report.archived { ", archived" } else { "" }
        ));
        lines.push(format!(
            "History: {} rows over {} dates",
            report.history_rows, report.history_dates
        ));

        lines.join("\n")
    }

    /// Formats one set's outcome.
    pub fn format_set_line(&self, set: &SetReport) -> String {
        let status = match &set.outcome {
            SetOutcome::Succeeded { cards, priced } => {
                self.green(&format!("✓ {cards} cards, {priced} priced"))
            }
            SetOutcome::SkippedEmpty { attempts } => {
                self.yellow(&format!("○ skipped: empty after {attempts} attempts"))
            }
            SetOutcome::Failed { reason } => self.red(&format!("✗ failed: {reason}")),
        };
        let marker = if set.is_new { self.cyan(" (new)") } else { String::new() };
        format!("{:<30} {}{}", set.set_name, status, marker)
    }

    /// Formats one card's history, oldest first.
    pub fn format_card_history(&self, history: &CardHistoryOutput) -> String {
        let mut lines = Vec::new();

        lines.push(format!(
            "{} {}",
            self.bold(&history.name),
            self.dim(&format!("#{} · {}", history.card_id, history.set_name))
        ));
        lines.push("─".repeat(30));
        for obs in &history.observations {
            lines.push(format!("{}  {:>10}", obs.date, self.format_price(obs.price)));
        }

        lines.join("\n")
    }

    /// Formats overall history statistics.
    pub fn format_history_stats(&self, stats: &HistoryStatsOutput) -> String {
        let range = match (stats.first_date, stats.last_date) {
            (Some(first), Some(last)) => format!("{first} .. {last}"),
            _ => self.dim("empty"),
        };
        [
            self.bold("Price history"),
            format!("Rows:  {}", stats.rows),
            format!("Cards: {}", stats.cards),
            format!("Dates: {} ({range})", stats.dates),
        ]
        .join("\n")
    }

    /// Formats the wide view as an aligned table.
    pub fn format_wide(&self, wide: &WideView) -> String {
        let mut header = format!("{:>8}  {:<24}", "card", "name");
        for date in &wide.dates {
            header.push_str(&format!("  {:>10}", date.format("%Y-%m-%d")));
        }

        let mut lines = vec![self.bold(&header)];
        for row in &wide.rows {
            let mut line = format!("{:>8}  {:<24}", row.card_id, truncate(&row.name, 24));
            for price in &row.prices {
                line.push_str(&format!("  {:>10}", self.format_price(*price)));
            }
            lines.push(line);
        }

        lines.join("\n")
    }

    /// Formats the effective configuration.
    pub fn format_config(&self, config: &Config, path: &Path) -> String {
        let lines = [
            self.bold("Cardex Configuration"),
            self.dim(&path.display().to_string()),
            "─".repeat(40),
            format!("Catalog URL:       {}", config.api.catalog_url),
            format!("Cards URL:         {}", config.api.cards_url),
            format!("Price URL:         {}", config.api.price_url),
            format!("Timeout:           {}s", config.api.timeout_secs),
            format!(
                "Retries:           {} (base {}s), then {} × {}s",
                config.retry.max_retries,
                config.retry.base_delay_secs,
                config.retry.max_escalations,
                config.retry.escalation_delay_secs
            ),
            format!("Empty attempts:    {}", config.retry.empty_result_attempts),
            format!(
                "Price lookup:      {}",
                if config.prices.per_card_lookup { "per card" } else { "embedded only" }
            ),
            format!("Inter-set delay:   {}s", config.pipeline.inter_set_delay_secs),
            format!("Data directory:    {}", config.storage.data_dir.display()),
            format!("Log level:         {}", config.log_level),
        ];
        lines.join("\n")
    }

    /// Formats a price, or a dash when absent.
    pub fn format_price(&self, price: Option<f64>) -> String {
        match price {
            Some(p) => format!("${p:.2}"),
            None => "-".to_string(),
        }
    }

    // ========================================================================
    // Color/style helpers
    // ========================================================================

    fn paint(&self, code: &str, text: &str) -> String {
        if self.use_colors {
            format!("{code}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }

    fn green(&self, text: &str) -> String {
        self.paint(GREEN, text)
    }

    fn yellow(&self, text: &str) -> String {
        self.paint(YELLOW, text)
    }

    fn red(&self, text: &str) -> String {
        self.paint(RED, text)
    }

    fn cyan(&self, text: &str) -> String {
        self.paint(CYAN, text)
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        text.to_string()
    } else {
        let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}
