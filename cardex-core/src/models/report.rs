//! Run outcome reporting.
//!
//! A [`RunReport`] enumerates which sets succeeded, were skipped as empty,
//! failed, or disappeared compared with the previous snapshot.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::set::SetId;

/// What happened to one set during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SetOutcome {
    /// Cards were fetched and priced.
    Succeeded {
        /// Number of cards fetched.
        cards: usize,
        /// Number of cards with a present price.
        priced: usize,
    },
    /// The set returned zero cards on every attempt and was accepted as empty.
    SkippedEmpty {
        /// Attempts made before accepting the empty result.
        attempts: u32,
    },
    /// Retrieval was exhausted or hit a non-retryable error.
    Failed {
        /// Human-readable cause.
        reason: String,
    },
}

impl SetOutcome {
    /// Returns the short label used in summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Succeeded { .. } => "succeeded",
            Self::SkippedEmpty { .. } => "skipped: empty",
            Self::Failed { .. } => "failed",
        }
    }
}

/// Outcome of one set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SetReport {
    /// Set identifier.
    pub set_id: SetId,
    /// Set name.
    pub set_name: String,
    /// True when the set was not in the previous snapshot.
    pub is_new: bool,
    /// What happened.
    #[serde(flatten)]
    pub outcome: SetOutcome,
}

/// A set present in the previous snapshot but missing from this run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbsentSet {
    /// Set identifier.
    pub set_id: SetId,
    /// Set name as last recorded.
    pub set_name: String,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    /// Date used for this run's price observations.
    pub run_date: NaiveDate,
    /// Per-set outcomes in processing order.
    pub sets: Vec<SetReport>,
    /// Sets that were in the previous snapshot but not in this one.
    pub absent: Vec<AbsentSet>,
    /// Cards written to the latest snapshot.
    pub snapshot_cards: usize,
    /// Rows in the price history after the merge.
    pub history_rows: usize,
    /// Distinct dates covered by the price history after the merge.
    pub history_dates: usize,
    /// Whether this run created the dated archive.
    pub archived: bool,
}

impl RunReport {
    /// Creates an empty report for `run_date`.
    pub fn new(run_date: NaiveDate) -> Self {
        Self {
            run_date,
            sets: Vec::new(),
            absent: Vec::new(),
            snapshot_cards: 0,
            history_rows: 0,
            history_dates: 0,
            archived: false,
        }
    }

    /// Sets whose cards were fetched.
    pub fn succeeded(&self) -> impl Iterator<Item = &SetReport> {
        self.sets
            .iter()
            .filter(|s| matches!(s.outcome, SetOutcome::Succeeded { .. }))
    }

    /// Sets accepted as legitimately empty.
    pub fn skipped(&self) -> impl Iterator<Item = &SetReport> {
        self.sets
            .iter()
            .filter(|s| matches!(s.outcome, SetOutcome::SkippedEmpty { .. }))
    }

    /// Sets whose retrieval failed.
    pub fn failed(&self) -> impl Iterator<Item = &SetReport> {
        self.sets
            .iter()
            .filter(|s| matches!(s.outcome, SetOutcome::Failed { .. }))
    }

    /// Sets that were new in this run.
    pub fn new_sets(&self) -> impl Iterator<Item = &SetReport> {
        self.sets.iter().filter(|s| s.is_new)
    }
}
