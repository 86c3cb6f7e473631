//! Scripted test doubles for the fetch seams.
//!
//! Available to this crate's tests and, via the `test-util` feature, to
//! downstream crates that need to drive a full run without network or sleeps.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::error::FetchError;
use crate::http::HttpFetcher;
use crate::sleep::Sleeper;

// ============================================================================
// Scripted Fetcher
// ============================================================================

struct Route {
    pattern: String,
    responses: VecDeque<Result<Value, FetchError>>,
}

/// [`HttpFetcher`] that replays scripted responses.
///
/// Each route matches URLs containing its pattern; the longest matching
/// pattern wins. Responses are consumed in order and the last one repeats.
#[derive(Default)]
pub struct ScriptedFetcher {
    routes: Mutex<Vec<Route>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    /// Creates a fetcher with no routes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a route answered by `responses` in order.
    #[must_use]
    pub fn on<I>(self, pattern: &str, responses: I) -> Self
    where
        I: IntoIterator<Item = Result<Value, FetchError>>,
    {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Route {
                pattern: pattern.to_string(),
                responses: responses.into_iter().collect(),
            });
        self
    }

    /// Adds a route that always answers `value`.
    #[must_use]
    pub fn on_ok(self, pattern: &str, value: Value) -> Self {
        self.on(pattern, [Ok(value)])
    }

    /// Every URL requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of requests whose URL contains `pattern`.
    pub fn request_count(&self, pattern: &str) -> usize {
        self.requests().iter().filter(|u| u.contains(pattern)).count()
    }
}

#[async_trait]
impl HttpFetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<Value, FetchError> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(url.to_string());

        let mut routes = self.routes.lock().unwrap_or_else(PoisonError::into_inner);
        let route = routes
            .iter_mut()
            .filter(|r| url.contains(&r.pattern))
            .max_by_key(|r| r.pattern.len());

        let Some(route) = route else {
            return Err(FetchError::Transient(format!("no scripted response for {url}")));
        };

        if route.responses.len() > 1 {
            route.responses.pop_front().unwrap_or(Ok(Value::Null))
        } else {
            route.responses.front().cloned().unwrap_or(Ok(Value::Null))
        }
    }
}

// ============================================================================
// Recording Sleeper
// ============================================================================

/// [`Sleeper`] that records requested waits and returns immediately.
#[derive(Debug, Default)]
pub struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every wait requested so far.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Sum of all requested waits.
    pub fn total(&self) -> Duration {
        self.sleeps().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration);
    }
}
