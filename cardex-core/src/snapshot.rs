//! Snapshot aggregation.
//!
//! Collects the priced cards of every processed set into one run snapshot and
//! derives a [`SetSummary`] per set. Pure computation; nothing here touches
//! the network or the filesystem.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Card, CardSet, PriceObservation, SetSummary};

/// The full catalog observed in one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Every card fetched in this run, in set order.
    pub cards: Vec<Card>,
    /// One summary per processed set.
    pub summaries: Vec<SetSummary>,
}

impl Snapshot {
    /// Returns one price observation per card, dated `date`.
    pub fn observations(&self, date: NaiveDate) -> Vec<PriceObservation> {
        self.cards
            .iter()
            .map(|card| PriceObservation::from_card(card, date))
            .collect()
    }

    /// Number of cards with a present price.
    pub fn priced_cards(&self) -> usize {
        self.cards.iter().filter(|c| c.price.is_some()).count()
    }

    /// Returns true if no set was recorded.
    pub fn is_empty(&self) -> bool {
        self.summaries.is_empty()
    }
}

/// Builds a [`Snapshot`] set by set.
#[derive(Debug, Default)]
pub struct SnapshotAggregator {
    snapshot: Snapshot,
}

impl SnapshotAggregator {
    /// Creates an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the priced cards of one set and returns its summary.
    pub fn record_set(&mut self, set: &CardSet, cards: Vec<Card>) -> &SetSummary {
        let summary = SetSummary::from_cards(set, &cards);
        self.snapshot.cards.extend(cards);
        self.snapshot.summaries.push(summary);
        // Just pushed.
        &self.snapshot.summaries[self.snapshot.summaries.len() - 1]
    }

    /// Number of sets recorded so far.
    pub fn set_count(&self) -> usize {
        self.snapshot.summaries.len()
    }

    /// Finishes aggregation.
    pub fn into_snapshot(self) -> Snapshot {
        self.snapshot
    }
}
