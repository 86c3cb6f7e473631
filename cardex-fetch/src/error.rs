//! Fetch error types.

use thiserror::Error;

// ============================================================================
// Single-attempt classification
// ============================================================================

/// Classified outcome of one failed request.
///
/// [`FetchError::RateLimited`] and [`FetchError::Transient`] are retried by
/// the [`RetryPolicy`](crate::retry::RetryPolicy); [`FetchError::Hard`] is not.
/// [`FetchError::EmptyResult`] is handled by the card fetcher with its own
/// bounded count.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// HTTP 429 from the upstream service.
    #[error("Rate limited, retry after {retry_after:?} seconds")]
    RateLimited {
        /// Seconds the server asked us to wait, if it said.
        retry_after: Option<u64>,
    },

    /// Network failure, timeout, unexpected status, or undecodable body.
    #[error("Transient error: {0}")]
    Transient(String),

    /// Unrecoverable failure, e.g. a payload that violates the endpoint contract.
    #[error("Hard error: {0}")]
    Hard(String),

    /// Zero items where items were expected.
    #[error("Empty result")]
    EmptyResult,
}

impl FetchError {
    /// Returns true if the retry policy should try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited { .. } | Self::Transient(_))
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            FetchError::Hard(err.to_string())
        } else if err.is_timeout() {
            FetchError::Transient(format!("request timed out: {err}"))
        } else {
            FetchError::Transient(err.to_string())
        }
    }
}

// ============================================================================
// Retry Error
// ============================================================================

/// Terminal failure of a unit of work driven by the retry policy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RetryError {
    /// Backoff and escalation budget consumed.
    #[error("Gave up after {attempts} attempts ({escalations} escalated waits): {last}")]
    Exhausted {
        /// Total requests made.
        attempts: u32,
        /// Escalated waits taken.
        escalations: u32,
        /// Error from the final attempt.
        #[source]
        last: FetchError,
    },

    /// The request failed with an error that is never retried.
    #[error("Non-retryable failure: {0}")]
    NonRetryable(#[source] FetchError),
}

impl RetryError {
    /// Returns the underlying fetch error.
    pub fn fetch_error(&self) -> &FetchError {
        match self {
            Self::Exhausted { last, .. } => last,
            Self::NonRetryable(err) => err,
        }
    }
}
