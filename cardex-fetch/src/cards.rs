//! Card retrieval for one set.
//!
//! Transport failures go through the [`RetryPolicy`]. A successful response
//! with zero cards is a separate condition: it is retried up to
//! `empty_result_attempts` times in total and then accepted as a set that
//! genuinely has no released cards.

use cardex_core::{CardSet, RawCard};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::endpoints::Endpoints;
use crate::error::{FetchError, RetryError};
use crate::http::HttpFetcher;
use crate::retry::RetryPolicy;
use crate::sleep::Sleeper;

/// Default number of attempts that must come back empty before an empty set
/// is accepted.
pub const DEFAULT_EMPTY_RESULT_ATTEMPTS: u32 = 2;

/// Cards fetched for one set.
#[derive(Debug, Clone, PartialEq)]
pub struct SetCards {
    /// Raw card records; empty when the set was accepted as empty.
    pub cards: Vec<RawCard>,
    /// Total requests made, including transport retries.
    pub attempts: u32,
    /// Requests that returned zero cards.
    pub empty_attempts: u32,
}

impl SetCards {
    /// Returns true if the set was accepted as empty.
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Fetches the cards of one set.
pub struct CardSetFetcher {
    http: Arc<dyn HttpFetcher>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    endpoints: Endpoints,
    empty_result_attempts: u32,
    empty_retry_delay: Duration,
}

impl CardSetFetcher {
    /// Creates a card fetcher.
    ///
    /// Empty results are retried after the policy's base delay.
    pub fn new(
        http: Arc<dyn HttpFetcher>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
        endpoints: Endpoints,
    ) -> Self {
        let empty_retry_delay = policy.base_delay;
        Self {
            http,
            sleeper,
            policy,
            endpoints,
            empty_result_attempts: DEFAULT_EMPTY_RESULT_ATTEMPTS,
            empty_retry_delay,
        }
    }

    /// Sets how many empty responses are required before accepting an empty set.
    #[must_use]
    pub fn with_empty_result_attempts(mut self, attempts: u32) -> Self {
        self.empty_result_attempts = attempts.max(1);
        self
    }

    /// Sets the wait between empty-result retries.
    #[must_use]
    pub fn with_empty_retry_delay(mut self, delay: Duration) -> Self {
        self.empty_retry_delay = delay;
        self
    }

    /// Fetches the raw cards of `set`.
    ///
    /// Returns an error only when the retry policy is exhausted or the
    /// response violates the endpoint contract; the caller skips the set.
    #[instrument(skip(self, set), fields(set = %set.name, set_id = set.id))]
    pub async fn get_cards(&self, set: &CardSet) -> Result<SetCards, RetryError> {
        let url = self
            .endpoints
            .cards_for(&set.name)
            .map_err(RetryError::NonRetryable)?;

        let mut attempts = 0u32;
        let mut empty_attempts = 0u32;

        loop {
            let http = &self.http;
            let url = url.as_str();
            let outcome = self
                .policy
                .run(self.sleeper.as_ref(), &set.name, move || async move {
                    let value = http.fetch(url).await?;
                    parse_cards(value)
                })
                .await;
            attempts += outcome.attempts_count();
            let cards = outcome.into_result()?;

            if !cards.is_empty() {
                debug!(count = cards.len(), attempts, "Fetched cards");
                return Ok(SetCards {
                    cards,
                    attempts,
                    empty_attempts,
                });
            }

            empty_attempts += 1;
            if empty_attempts >= self.empty_result_attempts {
                info!(empty_attempts, "Accepting set as empty");
                return Ok(SetCards {
                    cards: Vec::new(),
                    attempts,
                    empty_attempts,
                });
            }

            warn!(
                empty_attempts,
                max = self.empty_result_attempts,
                delay_secs = self.empty_retry_delay.as_secs(),
                error = %FetchError::EmptyResult,
                "Set returned no cards, retrying"
            );
            self.sleeper.sleep(self.empty_retry_delay).await;
        }
    }
}

/// Decodes a cards payload.
///
/// `null` decodes to no cards; a non-array payload or an undecodable record
/// is a contract violation.
pub fn parse_cards(value: Value) -> Result<Vec<RawCard>, FetchError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(_) => serde_json::from_value(value)
            .map_err(|e| FetchError::Hard(format!("malformed card record: {e}"))),
        other => Err(FetchError::Hard(format!(
            "expected an array of cards, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{RecordingSleeper, ScriptedFetcher};
    use serde_json::json;

    fn endpoints() -> Endpoints {
        Endpoints {
            catalog_url: "http://test/sets.json".into(),
            cards_url: "http://test/api/cards".into(),
            price_url: "http://test/api/stats?id={id}".into(),
        }
    }

    fn fetcher(http: Arc<ScriptedFetcher>, sleeper: Arc<RecordingSleeper>) -> CardSetFetcher {
        CardSetFetcher::new(
            http,
            sleeper,
            RetryPolicy::new(5).with_base_delay(Duration::from_secs(5)),
            endpoints(),
        )
    }

    fn two_cards() -> Value {
        json!([
            {"id": 1, "name": "Alakazam", "num": "1", "stats": [{"avg": 10.0}]},
            {"id": 2, "name": "Blastoise", "num": "2", "stats": []}
        ])
    }

    #[tokio::test]
    async fn test_rate_limited_twice_then_ok() {
        let http = Arc::new(ScriptedFetcher::new().on(
            "api/cards",
            [
                Err(FetchError::RateLimited { retry_after: None }),
                Err(FetchError::RateLimited { retry_after: None }),
                Ok(two_cards()),
            ],
        ));
        let sleeper = Arc::new(RecordingSleeper::new());

        let result = fetcher(http.clone(), sleeper.clone())
            .get_cards(&CardSet::new(1, "Base Set"))
            .await
            .unwrap();

        assert_eq!(result.cards.len(), 2);
        assert_eq!(result.attempts, 3);
        assert_eq!(
            sleeper.sleeps(),
            vec![Duration::from_secs(5), Duration::from_secs(10)]
        );
        assert_eq!(
            http.requests()[0],
            "http://test/api/cards?set_name=Base+Set&stats=kwan"
        );
    }

    #[tokio::test]
    async fn test_empty_twice_is_accepted() {
        let http = Arc::new(ScriptedFetcher::new().on_ok("api/cards", json!([])));
        let sleeper = Arc::new(RecordingSleeper::new());

        let result = fetcher(http.clone(), sleeper)
            .get_cards(&CardSet::new(9, "Promo"))
            .await
            .unwrap();

        assert!(result.is_empty());
        assert_eq!(result.empty_attempts, 2);
        assert_eq!(http.request_count("api/cards"), 2);
    }

    #[tokio::test]
    async fn test_empty_then_cards() {
        let http = Arc::new(
            ScriptedFetcher::new().on("api/cards", [Ok(Value::Null), Ok(two_cards())]),
        );
        let sleeper = Arc::new(RecordingSleeper::new());

        let result = fetcher(http, sleeper.clone())
            .get_cards(&CardSet::new(1, "Base Set"))
            .await
            .unwrap();

        assert_eq!(result.cards.len(), 2);
        assert_eq!(result.empty_attempts, 1);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(5)]);
    }

    #[tokio::test]
    async fn test_contract_violation_fails_without_retry() {
        let http = Arc::new(ScriptedFetcher::new().on_ok("api/cards", json!({"error": "nope"})));

        let err = fetcher(http.clone(), Arc::new(RecordingSleeper::new()))
            .get_cards(&CardSet::new(1, "Base Set"))
            .await
            .unwrap_err();

        assert!(matches!(err, RetryError::NonRetryable(FetchError::Hard(_))));
        assert_eq!(http.request_count("api/cards"), 1);
    }

    #[test]
    fn test_parse_null_is_empty() {
        assert!(parse_cards(Value::Null).unwrap().is_empty());
    }
}
