// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Cardex Fetch
//!
//! HTTP retrieval of the set catalog, per-set card lists, and per-card
//! prices, all behind a bounded retry policy.
//!
//! ## Seams
//!
//! - [`HttpFetcher`] - Issues a GET and decodes JSON ([`ReqwestFetcher`] in production)
//! - [`Sleeper`] - Every retry wait goes through this ([`TokioSleeper`] in production)
//!
//! ## Fetchers
//!
//! - [`SetCatalogFetcher`] - The full list of sets
//! - [`CardSetFetcher`] - The cards of one set, with empty-result handling
//! - [`PriceExtractor`] - A card's current price
//!
//! ## Retry
//!
//! [`RetryPolicy`] waits `base * 2^(n-1)` for the first `max_retries`
//! retryable failures, then takes up to `max_escalations` fixed long waits,
//! then gives up. Hard failures are never retried.
//!
//! ## Example
//!
//! ```ignore
//! use cardex_fetch::{ReqwestFetcher, RetryPolicy, SetCatalogFetcher, TokioSleeper};
//! use std::sync::Arc;
//!
//! let http = Arc::new(ReqwestFetcher::new()?);
//! let catalog = SetCatalogFetcher::new(
//!     http,
//!     Arc::new(TokioSleeper),
//!     RetryPolicy::default(),
//!     cardex_fetch::endpoints::DEFAULT_CATALOG_URL,
//! );
//! let sets = catalog.fetch_sets().await?;
//! ```

pub mod cards;
pub mod catalog;
pub mod endpoints;
pub mod error;
pub mod http;
pub mod price;
pub mod retry;
pub mod sleep;

#[cfg(any(test, feature = "test-util"))]
pub mod mock;

// Re-export key types at crate root

// Errors
pub use error::{FetchError, RetryError};

// Seams
pub use http::{HttpFetcher, ReqwestFetcher};
pub use sleep::{Sleeper, TokioSleeper};

// Fetchers
pub use cards::{CardSetFetcher, SetCards, parse_cards};
pub use catalog::{SetCatalogFetcher, parse_catalog};
pub use endpoints::Endpoints;
pub use price::{ExtractedPrice, PriceExtractor, PriceSource, parse_price_stats};

// Retry
pub use retry::{AttemptRecord, RetryOutcome, RetryPolicy, RetryState};
