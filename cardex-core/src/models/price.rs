//! Price observations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::card::{Card, CardId};

/// Rounds a price to two decimal places.
pub fn round_price(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Normalizes a raw upstream price: non-finite values become absent,
/// everything else is rounded to cents.
pub fn normalize_price(value: f64) -> Option<f64> {
    value.is_finite().then(|| round_price(value))
}

/// Composite key of a price observation.
///
/// Ordered by card first so one card's history is contiguous.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObservationKey {
    /// Card identifier.
    pub card_id: CardId,
    /// Observation date.
    pub date: NaiveDate,
}

/// One (card, date, price) fact; the atomic unit of price history.
///
/// Serializes to the long-format history columns
/// `card_id, name, set_name, date, price`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceObservation {
    /// Card identifier.
    pub card_id: CardId,
    /// Card name at observation time.
    pub name: String,
    /// Set name at observation time.
    pub set_name: String,
    /// Observation date.
    pub date: NaiveDate,
    /// Average price, or absent when no price was discoverable.
    pub price: Option<f64>,
}

impl PriceObservation {
    /// Creates an observation of `card` on `date`.
    pub fn from_card(card: &Card, date: NaiveDate) -> Self {
        Self {
            card_id: card.id,
            name: card.name.clone(),
            set_name: card.set_name.clone(),
            date,
            price: card.price,
        }
    }

    /// Returns the composite key of this observation.
    pub fn key(&self) -> ObservationKey {
        ObservationKey {
            card_id: self.card_id,
            date: self.date,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_price() {
        assert_eq!(round_price(3.456), 3.46);
        assert_eq!(round_price(3.454), 3.45);
        assert_eq!(round_price(0.0), 0.0);
    }

    #[test]
    fn test_normalize_rejects_non_finite() {
        assert_eq!(normalize_price(f64::NAN), None);
        assert_eq!(normalize_price(f64::INFINITY), None);
        assert_eq!(normalize_price(12.345_678), Some(12.35));
    }

    #[test]
    fn test_key_orders_by_card_then_date() {
        let d1 = NaiveDate::from_ymd_opt(2025, 5, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 5, 2).unwrap();
        let a = ObservationKey { card_id: 1, date: d2 };
        let b = ObservationKey { card_id: 2, date: d1 };
        assert!(a < b);
    }
}
