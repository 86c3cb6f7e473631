//! Card records.
//!
//! [`RawCard`] mirrors the cards endpoint; [`Card`] is the normalized row
//! written to the snapshot, tagged with the price extracted for this run.

use serde::{Deserialize, Serialize};

use super::de::{lenient_price, null_as_default};
use super::set::{CardSet, SetId};

/// Stable upstream identifier of a card.
pub type CardId = i64;

/// One entry of a card's embedded `stats` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CardStat {
    /// Average market price reported by this stat source.
    #[serde(default, deserialize_with = "lenient_price")]
    pub avg: Option<f64>,
}

/// A card record as returned by the cards-by-set endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCard {
    /// Card identifier.
    pub id: CardId,
    /// Parent set identifier, when the record carries one.
    #[serde(default)]
    pub set_id: Option<SetId>,
    /// Parent set code.
    #[serde(default, deserialize_with = "null_as_default")]
    pub set_code: String,
    /// Parent set name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub set_name: String,
    /// Card name.
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    /// Collector number within the set.
    #[serde(default, deserialize_with = "null_as_default")]
    pub num: String,
    /// Print language.
    #[serde(default, deserialize_with = "null_as_default")]
    pub language: String,
    /// Image reference.
    #[serde(default, deserialize_with = "null_as_default")]
    pub img_url: String,
    /// Release date as reported upstream.
    #[serde(default, deserialize_with = "null_as_default")]
    pub release_date: String,
    /// Trending flag.
    #[serde(default, deserialize_with = "null_as_default")]
    pub hot: bool,
    /// Secret-rare flag.
    #[serde(default, deserialize_with = "null_as_default")]
    pub secret: bool,
    /// Live-pricing flag.
    #[serde(default, deserialize_with = "null_as_default")]
    pub live: bool,
    /// Embedded price statistics, first entry is authoritative.
    #[serde(default, deserialize_with = "null_as_default")]
    pub stats: Vec<CardStat>,
}

impl RawCard {
    /// Creates a minimal raw card, used mostly by tests and fixtures.
    pub fn new(id: CardId, name: impl Into<String>) -> Self {
        Self {
            id,
            set_id: None,
            set_code: String::new(),
            set_name: String::new(),
            name: name.into(),
            num: String::new(),
            language: String::new(),
            img_url: String::new(),
            release_date: String::new(),
            hot: false,
            secret: false,
            live: false,
            stats: Vec::new(),
        }
    }

    /// Returns the `avg` of the first embedded stat, if any.
    pub fn embedded_avg(&self) -> Option<f64> {
        self.stats.first().and_then(|s| s.avg)
    }
}

/// A normalized card row tagged with the price observed in this run.
///
/// `price` is `None` when no price could be discovered; it is never
/// replaced by zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// Card identifier.
    pub id: CardId,
    /// Parent set identifier.
    pub set_id: SetId,
    /// Parent set name.
    pub set_name: String,
    /// Parent set code.
    pub set_code: String,
    /// Card name.
    pub name: String,
    /// Collector number.
    pub number: String,
    /// Print language.
    pub language: String,
    /// Image reference.
    pub image_url: String,
    /// Release date.
    pub release_date: String,
    /// Trending flag.
    pub hot: bool,
    /// Secret-rare flag.
    pub secret: bool,
    /// Live-pricing flag.
    pub live: bool,
    /// Average market price, rounded to cents, or absent.
    pub price: Option<f64>,
}

impl Card {
    /// Builds a snapshot row from a raw record and the set it was fetched for.
    ///
    /// Set id and code fall back to the parent set when the record omits them.
    pub fn from_raw(raw: &RawCard, set: &CardSet, price: Option<f64>) -> Self {
        let set_code = if raw.set_code.is_empty() {
            set.code.clone()
        } else {
            raw.set_code.clone()
        };

        Self {
            id: raw.id,
            set_id: raw.set_id.unwrap_or(set.id),
            set_name: set.name.clone(),
            set_code,
            name: raw.name.clone(),
            number: raw.num.clone(),
            language: raw.language.clone(),
            image_url: raw.img_url.clone(),
            release_date: raw.release_date.clone(),
            hot: raw.hot,
            secret: raw.secret,
            live: raw.live,
            price,
        }
    }
}
