//! Price extraction for a single card.
//!
//! With lookups enabled, the per-card stats endpoint is consulted first under
//! a light retry policy. When the lookup fails or yields nothing, the average
//! embedded in the card record is used. A card with neither is unpriced.

use cardex_core::{CardStat, RawCard, normalize_price};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::endpoints::Endpoints;
use crate::error::FetchError;
use crate::http::HttpFetcher;
use crate::retry::RetryPolicy;
use crate::sleep::Sleeper;

/// Where an extracted price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceSource {
    /// Per-card stats endpoint.
    Lookup,
    /// Average carried in the card record.
    Embedded,
    /// No price available.
    Absent,
}

/// A price together with its provenance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ExtractedPrice {
    /// Rounded price, or `None` when unpriced.
    pub price: Option<f64>,
    /// Where the price came from.
    pub source: PriceSource,
}

impl ExtractedPrice {
    fn absent() -> Self {
        Self {
            price: None,
            source: PriceSource::Absent,
        }
    }
}

struct Lookup {
    http: Arc<dyn HttpFetcher>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    endpoints: Endpoints,
}

/// Extracts a card's current price.
pub struct PriceExtractor {
    lookup: Option<Lookup>,
}

impl PriceExtractor {
    /// Creates an extractor that only reads embedded stats.
    pub fn embedded_only() -> Self {
        Self { lookup: None }
    }

    /// Creates an extractor that queries the stats endpoint per card.
    pub fn with_lookup(
        http: Arc<dyn HttpFetcher>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            lookup: Some(Lookup {
                http,
                sleeper,
                policy,
                endpoints,
            }),
        }
    }

    /// Returns true if per-card lookups are enabled.
    pub fn uses_lookup(&self) -> bool {
        self.lookup.is_some()
    }

    /// Extracts the price of `card`, recording its source.
    #[instrument(skip(self, card), fields(card_id = card.id))]
    pub async fn extract(&self, card: &RawCard) -> ExtractedPrice {
        if let Some(lookup) = &self.lookup {
            let url = lookup.endpoints.price_for(card.id);
            let http = &lookup.http;
            let url = url.as_str();
            let label = format!("price:{}", card.id);
            let outcome = lookup
                .policy
                .run(lookup.sleeper.as_ref(), &label, move || async move {
                    let value = http.fetch(url).await?;
                    parse_price_stats(value)
                })
                .await;

            match outcome.into_result() {
                Ok(Some(price)) => {
                    if let Some(price) = normalize_price(price) {
                        return ExtractedPrice {
                            price: Some(price),
                            source: PriceSource::Lookup,
                        };
                    }
                }
                Ok(None) => debug!("Lookup returned no price"),
                Err(e) => debug!(error = %e, "Price lookup failed, using embedded stats"),
            }
        }

        match card.embedded_avg().and_then(normalize_price) {
            Some(price) => ExtractedPrice {
                price: Some(price),
                source: PriceSource::Embedded,
            },
            None => ExtractedPrice::absent(),
        }
    }

    /// Extracts just the price of `card`.
    pub async fn extract_price(&self, card: &RawCard) -> Option<f64> {
        self.extract(card).await.price
    }
}

/// Decodes a per-card stats payload into its first average.
///
/// `null` and an empty list both mean "no price".
pub fn parse_price_stats(value: Value) -> Result<Option<f64>, FetchError> {
    if value.is_null() {
        return Ok(None);
    }
    let stats: Vec<CardStat> = serde_json::from_value(value)
        .map_err(|e| FetchError::Hard(format!("malformed price stats: {e}")))?;
    Ok(stats.first().and_then(|s| s.avg))
}

// ============================================================================
// Tests
// ============================================================================
