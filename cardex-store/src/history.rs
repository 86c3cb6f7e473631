//! Long-format price history.
//!
//! History is a keyed map on `(card_id, date)`, so one observation per card
//! per day holds by construction. Merging upserts the current run's
//! observations under the run date and leaves every other date untouched.

use cardex_core::{CardId, ObservationKey, PriceObservation};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// The full price history across all runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceHistory {
    rows: BTreeMap<ObservationKey, PriceObservation>,
}

impl PriceHistory {
    /// Creates an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from stored rows.
    ///
    /// Rows sharing a key collapse to the last one seen.
    pub fn from_observations(observations: impl IntoIterator<Item = PriceObservation>) -> Self {
        let mut history = Self::new();
        let mut duplicates = 0usize;
        for obs in observations {
            if history.upsert(obs).is_some() {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            warn!(duplicates, "Collapsed duplicate history rows");
        }
        history
    }

    /// Merges `observations` into `existing` under `run_date`.
    ///
    /// Each observation is re-keyed to `run_date` before the upsert, so a
    /// second run on the same date replaces rather than duplicates.
    pub fn merge(
        mut existing: PriceHistory,
        observations: &[PriceObservation],
        run_date: NaiveDate,
    ) -> PriceHistory {
        let before = existing.len();
        let mut replaced = 0usize;

        for obs in observations {
            let obs = PriceObservation {
                date: run_date,
                ..obs.clone()
            };
            if existing.upsert(obs).is_some() {
                replaced += 1;
            }
        }

        debug!(
            before,
            after = existing.len(),
            replaced,
            date = %run_date,
            "Merged price observations"
        );
        existing
    }

    /// Inserts or replaces the observation for its key, returning the old one.
    pub fn upsert(&mut self, observation: PriceObservation) -> Option<PriceObservation> {
        self.rows.insert(observation.key(), observation)
    }

    /// Returns the observation for `card_id` on `date`.
    pub fn get(&self, card_id: CardId, date: NaiveDate) -> Option<&PriceObservation> {
        self.rows.get(&ObservationKey { card_id, date })
    }

    /// Number of (card, date) rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if no rows are recorded.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Distinct observation dates, ascending.
    pub fn dates(&self) -> BTreeSet<NaiveDate> {
        self.rows.keys().map(|k| k.date).collect()
    }

    /// Distinct set names that have any observation.
    pub fn set_names(&self) -> BTreeSet<&str> {
        self.rows.values().map(|o| o.set_name.as_str()).collect()
    }

    /// Rows observed on `date`.
    pub fn rows_on(&self, date: NaiveDate) -> usize {
        self.rows.keys().filter(|k| k.date == date).count()
    }

    /// All observations of one card, oldest first.
    pub fn for_card(&self, card_id: CardId) -> Vec<&PriceObservation> {
        let start = ObservationKey {
            card_id,
            date: NaiveDate::MIN,
        };
        let end = ObservationKey {
            card_id,
            date: NaiveDate::MAX,
        };
        self.rows.range(start..=end).map(|(_, obs)| obs).collect()
    }

    /// Iterates rows ordered by card, then date.
    pub fn iter(&self) -> impl Iterator<Item = &PriceObservation> {
        self.rows.values()
    }

    /// Derives the wide view: one row per card, one price column per date.
    ///
    /// Name and set name come from each card's most recent observation.
    pub fn wide_view(&self) -> WideView {
        let dates: Vec<NaiveDate> = self.dates().into_iter().collect();
        let mut rows: Vec<WideRow> = Vec::new();

        for obs in self.rows.values() {
            let Ok(column) = dates.binary_search(&obs.date) else {
                continue;
            };
            if rows.last().is_none_or(|row| row.card_id != obs.card_id) {
                rows.push(WideRow {
                    card_id: obs.card_id,
                    name: String::new(),
                    set_name: String::new(),
                    prices: vec![None; dates.len()],
                });
            }
            let Some(row) = rows.last_mut() else {
                continue;
            };
            row.name.clone_from(&obs.name);
            row.set_name.clone_from(&obs.set_name);
            row.prices[column] = obs.price;
        }

        WideView { dates, rows }
    }
}

impl FromIterator<PriceObservation> for PriceHistory {
    fn from_iter<I: IntoIterator<Item = PriceObservation>>(iter: I) -> Self {
        Self::from_observations(iter)
    }
}

// ============================================================================
// Wide View
// ============================================================================

/// History pivoted to one column per date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideView {
    /// Column dates, ascending.
    pub dates: Vec<NaiveDate>,
    /// One row per card, ordered by card id.
    pub rows: Vec<WideRow>,
}

/// One card's prices across all dates.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WideRow {
    /// Card identifier.
    pub card_id: CardId,
    /// Latest known card name.
    pub name: String,
    /// Latest known set name.
    pub set_name: String,
    /// Price per column date; `None` where the card has no observation or
    /// was unpriced.
    pub prices: Vec<Option<f64>>,
}

// ============================================================================
// Tests
// ============================================================================
