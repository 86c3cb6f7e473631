// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Cardex Core
//!
//! Core types, models, and traits for the Cardex price tracker.
//!
//! This crate provides the foundational abstractions used across all other
//! Cardex crates, including:
//!
//! - Domain models (sets, cards, price observations, set summaries)
//! - Error types
//! - The [`Clock`] seam used to date price observations
//! - Snapshot aggregation (per-set summaries for one run)
//!
//! ## Key Types
//!
//! ### Catalog
//! - [`CardSet`] - A set record from the upstream catalog
//! - [`RawCard`] - A card record exactly as the cards endpoint returns it
//! - [`Card`] - A normalized card tagged with its current price
//!
//! ### Prices
//! - [`PriceObservation`] - One (card, date, price) fact
//! - [`ObservationKey`] - The composite (card, date) key
//! - [`SetSummary`] - Per-set totals derived from one run
//!
//! ### Runs
//! - [`Snapshot`] - Full catalog and summaries observed in one run
//! - [`RunReport`] - Which sets succeeded, were skipped, failed, or went absent

pub mod error;
pub mod models;
pub mod snapshot;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Catalog
    Card,
    CardId,
    CardSet,
    CardStat,
    RawCard,
    SetId,
    // Prices
    ObservationKey,
    PriceObservation,
    SetSummary,
    normalize_price,
    round_price,
    // Runs
    AbsentSet,
    RunReport,
    SetOutcome,
    SetReport,
};

pub use snapshot::{Snapshot, SnapshotAggregator};

// Re-export traits
pub use traits::{Clock, FixedClock, SystemClock};
