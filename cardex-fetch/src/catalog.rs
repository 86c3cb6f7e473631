//! Set catalog retrieval.

use cardex_core::CardSet;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::error::{FetchError, RetryError};
use crate::http::HttpFetcher;
use crate::retry::RetryPolicy;
use crate::sleep::Sleeper;

/// JSON pointer to the set array inside the catalog payload.
const SET_ARRAY_POINTER: &str = "/pageProps/setInfoArr";

/// Fetches the full list of sets.
///
/// Failure here is fatal for a run: nothing downstream can proceed without
/// the catalog.
pub struct SetCatalogFetcher {
    http: Arc<dyn HttpFetcher>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    url: String,
}

impl SetCatalogFetcher {
    /// Creates a catalog fetcher for `url`.
    pub fn new(
        http: Arc<dyn HttpFetcher>,
        sleeper: Arc<dyn Sleeper>,
        policy: RetryPolicy,
        url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            sleeper,
            policy,
            url: url.into(),
        }
    }

    /// Fetches and decodes the set catalog under the retry policy.
    #[instrument(skip(self), fields(url = %self.url))]
    pub async fn fetch_sets(&self) -> Result<Vec<CardSet>, RetryError> {
        let http = &self.http;
        let url = self.url.as_str();
        let outcome = self
            .policy
            .run(self.sleeper.as_ref(), "catalog", move || async move {
                let value = http.fetch(url).await?;
                parse_catalog(value)
            })
            .await;

        let sets = outcome.into_result()?;
        info!(count = sets.len(), "Fetched set catalog");
        Ok(sets)
    }
}

/// Decodes the catalog payload.
///
/// Accepts the `pageProps.setInfoArr` envelope or a bare array. Anything else
/// violates the endpoint contract and is a hard error. Sets that fail
/// [`CardSet::validate`] are dropped with a warning.
pub fn parse_catalog(value: Value) -> Result<Vec<CardSet>, FetchError> {
    let array = match value {
        Value::Array(_) => value,
        other => other
            .pointer(SET_ARRAY_POINTER)
            .cloned()
            .ok_or_else(|| FetchError::Hard("catalog payload has no pageProps.setInfoArr".to_string()))?,
    };

    let sets: Vec<CardSet> = serde_json::from_value(array)
        .map_err(|e| FetchError::Hard(format!("malformed set record: {e}")))?;

    Ok(sets
        .into_iter()
        .filter(|set| match set.validate() {
            Ok(()) => true,
            Err(e) => {
                warn!(set = set.id, error = %e, "Dropping set from catalog");
                false
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{RecordingSleeper, ScriptedFetcher};
    use serde_json::json;
    use std::time::Duration;

    fn catalog() -> Value {
        json!({
            "pageProps": {
                "setInfoArr": [
                    {"id": 1, "name": "Base Set", "code": "BS", "series": "Original",
                     "release_date": "Sat, 09 Jan 1999 00:00:00 GMT", "language": "ENGLISH"},
                    {"id": 2, "name": "Jungle", "code": null}
                ]
            }
        })
    }

    #[test]
    fn test_parse_envelope() {
        let sets = parse_catalog(catalog()).unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].name, "Base Set");
        assert_eq!(sets[1].code, "");
    }

    #[test]
    fn test_parse_missing_envelope_is_hard() {
        let err = parse_catalog(json!({"pageProps": {}})).unwrap_err();
        assert!(matches!(err, FetchError::Hard(_)));
    }

    #[test]
    fn test_parse_drops_blank_names() {
        let sets = parse_catalog(json!([{"id": 1, "name": "Base Set"}, {"id": 2, "name": ""}])).unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].id, 1);
    }

    #[test]
    fn test_parse_bad_record_is_hard() {
        let err = parse_catalog(json!([{"name": "no id"}])).unwrap_err();
        assert!(matches!(err, FetchError::Hard(_)));
    }

    #[tokio::test]
    async fn test_fetch_retries_then_succeeds() {
        let http = Arc::new(ScriptedFetcher::new().on(
            "sets.json",
            [
                Err(FetchError::Transient("timeout".into())),
                Ok(catalog()),
            ],
        ));
        let sleeper = Arc::new(RecordingSleeper::new());
        let fetcher = SetCatalogFetcher::new(
            http.clone(),
            sleeper.clone(),
            RetryPolicy::new(3).with_base_delay(Duration::from_secs(2)),
            "http://test/sets.json",
        );

        let sets = fetcher.fetch_sets().await.unwrap();
        assert_eq!(sets.len(), 2);
        assert_eq!(http.request_count("sets.json"), 2);
        assert_eq!(sleeper.sleeps(), vec![Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_fetch_exhaustion_is_reported() {
        let http = Arc::new(
            ScriptedFetcher::new().on("sets.json", [Err(FetchError::RateLimited { retry_after: None })]),
        );
        let fetcher = SetCatalogFetcher::new(
            http,
            Arc::new(RecordingSleeper::new()),
            RetryPolicy::new(1).with_escalation(Duration::from_secs(600), 1),
            "http://test/sets.json",
        );

        let err = fetcher.fetch_sets().await.unwrap_err();
        assert!(matches!(err, RetryError::Exhausted { attempts: 3, escalations: 1, .. }));
    }
}
