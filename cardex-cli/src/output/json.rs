//! JSON output formatting.

use anyhow::Result;
use cardex_core::{CardId, PriceObservation};
use cardex_store::PriceHistory;
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeSet;

// ============================================================================
// Output Types
// ============================================================================

/// One card's stored history.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardHistoryOutput {
    pub card_id: CardId,
    pub name: String,
    pub set_name: String,
    pub observations: Vec<ObservationOutput>,
}

/// A single dated price.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationOutput {
    pub date: NaiveDate,
    pub price: Option<f64>,
}

impl CardHistoryOutput {
    /// Builds the output from a card's rows, oldest first.
    ///
    /// Name and set name come from the most recent row.
    pub fn new(card_id: CardId, rows: &[&PriceObservation]) -> Self {
        let latest = rows.last();
        Self {
            card_id,
            name: latest.map(|o| o.name.clone()).unwrap_or_default(),
            set_name: latest.map(|o| o.set_name.clone()).unwrap_or_default(),
            observations: rows
                .iter()
                .map(|o| ObservationOutput {
                    date: o.date,
                    price: o.price,
                })
                .collect(),
        }
    }
}

/// Overall history statistics.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStatsOutput {
    pub rows: usize,
    pub cards: usize,
    pub dates: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_date: Option<NaiveDate>,
}

impl HistoryStatsOutput {
    /// Summarizes `history`.
    pub fn from_history(history: &PriceHistory) -> Self {
        let dates = history.dates();
        let cards: BTreeSet<CardId> = history.iter().map(|o| o.card_id).collect();
        Self {
            rows: history.len(),
            cards: cards.len(),
            dates: dates.len(),
            first_date: dates.first().copied(),
            last_date: dates.last().copied(),
        }
    }
}

// ============================================================================
// JSON Formatter
// ============================================================================

/// JSON formatter.
pub struct JsonFormatter {
    pretty: bool,
}

impl JsonFormatter {
    /// Creates a new JSON formatter.
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    /// Formats any serializable value.
    pub fn format<T: Serialize>(&self, data: &T) -> Result<String> {
        let json = if self.pretty {
            serde_json::to_string_pretty(data)?
        } else {
            serde_json::to_string(data)?
        };
        Ok(json)
    }
}
