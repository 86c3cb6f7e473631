//! Domain models for Cardex.
//!
//! ## Submodules
//!
//! - [`set`] - Set catalog records
//! - [`card`] - Raw and normalized card records
//! - [`price`] - Price observations and price normalization
//! - [`summary`] - Per-set summary statistics
//! - [`report`] - Per-run outcome reporting

mod card;
mod de;
mod price;
mod report;
mod set;
mod summary;

// Re-export everything at the models level
pub use card::{Card, CardId, CardStat, RawCard};
pub use price::{ObservationKey, PriceObservation, normalize_price, round_price};
pub use report::{AbsentSet, RunReport, SetOutcome, SetReport};
pub use set::{CardSet, SetId};
pub use summary::SetSummary;
