//! Upstream endpoint locations.

use url::Url;

use crate::error::FetchError;

/// Default set catalog URL.
pub const DEFAULT_CATALOG_URL: &str =
    "https://www.pokedata.io/_next/data/3UYacdm8ZflJ3oxZlMwiK/sets.json";

/// Default cards-by-set URL (query parameters are appended).
pub const DEFAULT_CARDS_URL: &str = "https://www.pokedata.io/api/cards";

/// Default per-card price URL; `{id}` is replaced by the card id.
pub const DEFAULT_PRICE_URL: &str = "https://www.pokedata.io/api/stats?id={id}";

/// Where the three upstream endpoints live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Set catalog endpoint.
    pub catalog_url: String,
    /// Cards-by-set endpoint.
    pub cards_url: String,
    /// Per-card price endpoint template.
    pub price_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            cards_url: DEFAULT_CARDS_URL.to_string(),
            price_url: DEFAULT_PRICE_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Builds the cards URL for a set, URL-encoding its name.
    ///
    /// Spaces encode as `+`, which is what the service expects.
    pub fn cards_for(&self, set_name: &str) -> Result<String, FetchError> {
        let url = Url::parse_with_params(
            &self.cards_url,
            &[("set_name", set_name), ("stats", "kwan")],
        )
        .map_err(|e| FetchError::Hard(format!("invalid cards URL {}: {e}", self.cards_url)))?;
        Ok(url.into())
    }

    /// Builds the price URL for a card.
    pub fn price_for(&self, card_id: i64) -> String {
        self.price_url.replace("{id}", &card_id.to_string())
    }
}
