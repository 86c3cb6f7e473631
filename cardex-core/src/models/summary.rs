//! Per-set summary statistics.

use serde::{Deserialize, Serialize};

use super::card::Card;
use super::price::round_price;
use super::set::{CardSet, SetId};

/// Totals for one set in one run.
///
/// Always recomputed from the run's cards; never persisted on its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetSummary {
    /// Set identifier.
    pub set_id: SetId,
    /// Set name.
    pub set_name: String,
    /// Set code.
    pub set_code: String,
    /// Series.
    pub series: String,
    /// Language.
    pub language: String,
    /// Release date.
    pub release_date: String,
    /// Number of cards fetched for the set.
    pub total_cards: usize,
    /// Sum of present prices.
    pub total_value: f64,
    /// `total_value / total_cards`, or 0 for an empty set.
    pub avg_value: f64,
}

impl SetSummary {
    /// Computes the summary of `cards` belonging to `set`.
    ///
    /// Absent prices count as zero here and nowhere else.
    #[allow(clippy::cast_precision_loss)]
    pub fn from_cards(set: &CardSet, cards: &[Card]) -> Self {
        let total_cards = cards.len();
        let total_value: f64 = cards.iter().map(|c| c.price.unwrap_or(0.0)).sum();
        let avg_value = if total_cards > 0 {
            total_value / total_cards as f64
        } else {
            0.0
        };

        Self {
            set_id: set.id,
            set_name: set.name.clone(),
            set_code: set.code.clone(),
            series: set.series.clone(),
            language: set.language.clone(),
            release_date: set.release_date.clone(),
            total_cards,
            total_value: round_price(total_value),
            avg_value: round_price(avg_value),
        }
    }
}
