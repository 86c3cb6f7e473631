//! Configuration management.
//!
//! Every field has a default, so a missing file or a partial file both load.

use cardex_fetch::cards::DEFAULT_EMPTY_RESULT_ATTEMPTS;
use cardex_fetch::endpoints::{DEFAULT_CARDS_URL, DEFAULT_CATALOG_URL, DEFAULT_PRICE_URL};
use cardex_fetch::http::{DEFAULT_TIMEOUT_SECS, USER_AGENT};
use cardex_fetch::retry::{
    DEFAULT_BASE_DELAY, DEFAULT_ESCALATION_DELAY, DEFAULT_MAX_ESCALATIONS, DEFAULT_MAX_RETRIES,
};
use cardex_fetch::{Endpoints, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::error::StoreError;
use crate::lock::DEFAULT_STALE_AFTER;

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Upstream API settings.
    #[serde(default)]
    pub api: ApiConfig,
    /// Retry settings for catalog and card requests.
    #[serde(default)]
    pub retry: RetryConfig,
    /// Price extraction settings.
    #[serde(default)]
    pub prices: PriceConfig,
    /// Run pacing.
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Output locations.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Default log filter.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Upstream API settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Set catalog URL.
    pub catalog_url: String,
    /// Cards-by-set URL.
    pub cards_url: String,
    /// Per-card price URL with an `{id}` placeholder.
    pub price_url: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// User agent header.
    pub user_agent: String,
}

/// Retry settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Backoff retries before escalating.
    pub max_retries: u32,
    /// Base backoff delay in seconds.
    pub base_delay_secs: u64,
    /// Escalated wait in seconds.
    pub escalation_delay_secs: u64,
    /// Escalated waits before giving up.
    pub max_escalations: u32,
    /// Empty responses required before a set is accepted as empty.
    pub empty_result_attempts: u32,
}

/// Price extraction settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    /// Query the per-card stats endpoint before falling back to embedded stats.
    pub per_card_lookup: bool,
    /// Backoff retries for a single price lookup.
    pub lookup_max_retries: u32,
}

/// Run pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Pause between consecutive sets in seconds.
    pub inter_set_delay_secs: u64,
}

/// Output locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Root of the latest, archive, and history tables.
    pub data_dir: PathBuf,
    /// Age in seconds after which a leftover history lock is reclaimed.
    pub lock_stale_secs: u64,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            retry: RetryConfig::default(),
            prices: PriceConfig::default(),
            pipeline: PipelineConfig::default(),
            storage: StorageConfig::default(),
            log_level: default_log_level(),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            catalog_url: DEFAULT_CATALOG_URL.to_string(),
            cards_url: DEFAULT_CARDS_URL.to_string(),
            price_url: DEFAULT_PRICE_URL.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: USER_AGENT.to_string(),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay_secs: DEFAULT_BASE_DELAY.as_secs(),
            escalation_delay_secs: DEFAULT_ESCALATION_DELAY.as_secs(),
            max_escalations: DEFAULT_MAX_ESCALATIONS,
            empty_result_attempts: DEFAULT_EMPTY_RESULT_ATTEMPTS,
        }
    }
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            per_card_lookup: true,
            lookup_max_retries: 2,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            inter_set_delay_secs: 5,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            lock_stale_secs: DEFAULT_STALE_AFTER.as_secs(),
        }
    }
}

impl Config {
    /// Returns the default configuration file path.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("cardex")
            .join("config.json")
    }

    /// Loads configuration from the default path.
    pub fn load() -> Result<Self, StoreError> {
        Self::load_from(&Self::default_path())
    }

    /// Loads configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;

        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Saves configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        info!(path = %path.display(), "Saved configuration");
        Ok(())
    }

    /// Rejects values no run could work with.
    pub fn validate(&self) -> Result<(), StoreError> {
        if !self.api.price_url.contains("{id}") {
            return Err(StoreError::Config(
                "api.price_url must contain an {id} placeholder".to_string(),
            ));
        }
        if self.retry.empty_result_attempts == 0 {
            return Err(StoreError::Config(
                "retry.empty_result_attempts must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Endpoint locations.
    pub fn endpoints(&self) -> Endpoints {
        Endpoints {
            catalog_url: self.api.catalog_url.clone(),
            cards_url: self.api.cards_url.clone(),
            price_url: self.api.price_url.clone(),
        }
    }

    /// Request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.api.timeout_secs)
    }

    /// Retry policy for catalog and card requests.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retry.max_retries)
            .with_base_delay(Duration::from_secs(self.retry.base_delay_secs))
            .with_escalation(
                Duration::from_secs(self.retry.escalation_delay_secs),
                self.retry.max_escalations,
            )
    }

    /// Retry policy for per-card price lookups; `None` when lookups are off.
    ///
    /// Lookups never escalate since the embedded price is a fallback.
    pub fn lookup_policy(&self) -> Option<RetryPolicy> {
        self.prices.per_card_lookup.then(|| {
            RetryPolicy::new(self.prices.lookup_max_retries)
                .with_base_delay(Duration::from_secs(self.retry.base_delay_secs))
                .with_escalation(Duration::ZERO, 0)
        })
    }

    /// Pause between sets.
    pub fn inter_set_delay(&self) -> Duration {
        Duration::from_secs(self.pipeline.inter_set_delay_secs)
    }

    /// Age after which a leftover history lock is reclaimed.
    pub fn lock_stale_after(&self) -> Duration {
        Duration::from_secs(self.storage.lock_stale_secs)
    }
}
