//! HTTP fetching with outcome classification.
//!
//! [`HttpFetcher::fetch`] performs exactly one round trip and sorts the result
//! into success, rate-limited, transient, or hard failure. Retrying is the
//! caller's business.

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode, header};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::error::FetchError;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// User agent string for Cardex.
pub const USER_AGENT: &str = concat!("Cardex/", env!("CARGO_PKG_VERSION"));

// ============================================================================
// Fetcher Trait
// ============================================================================

/// Performs a single GET and classifies the outcome.
#[async_trait]
pub trait HttpFetcher: Send + Sync {
    /// Fetches `url` and decodes the body as JSON.
    ///
    /// An empty body is a valid, empty payload (`Value::Null`).
    async fn fetch(&self, url: &str) -> Result<Value, FetchError>;
}

// ============================================================================
// Reqwest Implementation
// ============================================================================

/// [`HttpFetcher`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    inner: Client,
}

impl ReqwestFetcher {
    /// Creates a fetcher with the default timeout and user agent.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(Duration::from_secs(DEFAULT_TIMEOUT_SECS), USER_AGENT)
    }

    /// Creates a fetcher with a custom timeout and user agent.
    pub fn with_options(timeout: Duration, user_agent: &str) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| FetchError::Hard(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { inner: client })
    }
}

#[async_trait]
impl HttpFetcher for ReqwestFetcher {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        debug!("GET request");
        let response = self.inner.get(url).send().await?;
        let status = response.status();
        debug!(status = %status, "Response received");

        classify(status, response.retry_after_secs())?;

        let body = response.bytes().await?;
        decode_body(&body)
    }
}

/// Sorts a response status into success or a fetch failure.
///
/// 429 is rate limiting and carries the `Retry-After` seconds, if any. Every
/// other non-2xx status is transient.
pub fn classify(status: StatusCode, retry_after: Option<u64>) -> Result<(), FetchError> {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(FetchError::RateLimited { retry_after });
    }
    if !status.is_success() {
        return Err(FetchError::Transient(format!(
            "Unexpected status code: {status}"
        )));
    }
    Ok(())
}

/// Decodes a response body; blank bodies decode to `Value::Null`.
pub fn decode_body(body: &[u8]) -> Result<Value, FetchError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| FetchError::Transient(format!("invalid JSON body: {e}")))
}

// ============================================================================
// Response Extensions
// ============================================================================

/// Extension trait for Response handling.
pub trait ResponseExt {
    /// Get the Retry-After header value in seconds.
    fn retry_after_secs(&self) -> Option<u64>;
}

impl ResponseExt for Response {
    fn retry_after_secs(&self) -> Option<u64> {
        parse_retry_after(self.headers().get(header::RETRY_AFTER)?.to_str().ok()?)
    }
}

/// Parses a `Retry-After` value given in seconds. HTTP dates are ignored.
pub fn parse_retry_after(value: &str) -> Option<u64> {
    value.trim().parse().ok()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_body_is_empty_payload() {
        assert_eq!(decode_body(b"").unwrap(), Value::Null);
        assert_eq!(decode_body(b"  \n").unwrap(), Value::Null);
    }

    #[test]
    fn test_empty_array_is_ok() {
        assert_eq!(decode_body(b"[]").unwrap(), serde_json::json!([]));
    }

    #[test]
    fn test_garbage_body_is_transient() {
        let err = decode_body(b"<html>502</html>").unwrap_err();
        assert!(matches!(err, FetchError::Transient(_)));
        assert!(err.is_retryable());
    }

    #[test]
    fn test_success_status_passes() {
        assert!(classify(StatusCode::OK, None).is_ok());
        assert!(classify(StatusCode::NO_CONTENT, Some(3)).is_ok());
    }

    #[test]
    fn test_too_many_requests_is_rate_limited() {
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, Some(30)),
            Err(FetchError::RateLimited { retry_after: Some(30) })
        );
        assert_eq!(
            classify(StatusCode::TOO_MANY_REQUESTS, None),
            Err(FetchError::RateLimited { retry_after: None })
        );
    }

    #[test]
    fn test_other_failures_are_transient() {
        for status in [StatusCode::NOT_FOUND, StatusCode::SERVICE_UNAVAILABLE] {
            let err = classify(status, Some(30)).unwrap_err();
            assert!(matches!(err, FetchError::Transient(_)), "{status}");
            assert!(err.to_string().contains(status.as_str()));
        }
    }

    #[test]
    fn test_retry_after_seconds() {
        assert_eq!(parse_retry_after(" 12 "), Some(12));
        assert_eq!(parse_retry_after("Wed, 21 Oct 2015 07:28:00 GMT"), None);
    }

    #[test]
    fn test_client_builds() {
        assert!(ReqwestFetcher::new().is_ok());
    }
}
