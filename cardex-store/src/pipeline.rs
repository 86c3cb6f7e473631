//! The run pipeline.
//!
//! One run fetches the catalog, then processes sets strictly one at a time:
//! cards, prices, aggregation. Only after every set is processed does it
//! touch disk, first the latest tables and the dated archive, then the
//! history merge. Everything before the write phase can fail or be cancelled
//! without leaving partial output.

use cardex_core::{
    AbsentSet, Card, CardSet, Clock, RunReport, SetId, SetOutcome, SetReport, SnapshotAggregator,
};
use cardex_fetch::{
    CardSetFetcher, Endpoints, HttpFetcher, PriceExtractor, RetryError, RetryPolicy,
    SetCatalogFetcher, Sleeper,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::error::StoreError;
use crate::history::PriceHistory;
use crate::persistence::SnapshotStore;

// ============================================================================
// Errors
// ============================================================================

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The set catalog could not be fetched.
    #[error("Set catalog fetch failed: {0}")]
    Catalog(#[source] RetryError),

    /// The run was cancelled before writing.
    #[error("Run cancelled")]
    Cancelled,

    /// Writing output failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

// ============================================================================
// Settings
// ============================================================================

/// Knobs for one pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Upstream endpoints.
    pub endpoints: Endpoints,
    /// Policy for catalog and card requests.
    pub retry: RetryPolicy,
    /// Policy for per-card price lookups; `None` reads embedded prices only.
    pub lookup: Option<RetryPolicy>,
    /// Empty responses required before a set is accepted as empty.
    pub empty_result_attempts: u32,
    /// Pause between consecutive sets.
    pub inter_set_delay: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            endpoints: config.endpoints(),
            retry: config.retry_policy(),
            lookup: config.lookup_policy(),
            empty_result_attempts: config.retry.empty_result_attempts,
            inter_set_delay: config.inter_set_delay(),
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

/// A configured run with its injected collaborators.
pub struct Pipeline {
    catalog: SetCatalogFetcher,
    cards: CardSetFetcher,
    prices: PriceExtractor,
    sleeper: Arc<dyn Sleeper>,
    clock: Arc<dyn Clock>,
    store: SnapshotStore,
    inter_set_delay: Duration,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    /// Creates a pipeline.
    pub fn new(
        http: Arc<dyn HttpFetcher>,
        sleeper: Arc<dyn Sleeper>,
        clock: Arc<dyn Clock>,
        store: SnapshotStore,
        settings: PipelineSettings,
    ) -> Self {
        let catalog = SetCatalogFetcher::new(
            Arc::clone(&http),
            Arc::clone(&sleeper),
            settings.retry.clone(),
            settings.endpoints.catalog_url.clone(),
        );
        let cards = CardSetFetcher::new(
            Arc::clone(&http),
            Arc::clone(&sleeper),
            settings.retry,
            settings.endpoints.clone(),
        )
        .with_empty_result_attempts(settings.empty_result_attempts);
        let prices = match settings.lookup {
            Some(policy) => PriceExtractor::with_lookup(
                http,
                Arc::clone(&sleeper),
                policy,
                settings.endpoints,
            ),
            None => PriceExtractor::embedded_only(),
        };

        Self {
            catalog,
            cards,
            prices,
            sleeper,
            clock,
            store,
            inter_set_delay: settings.inter_set_delay,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses `flag` as the cancellation signal.
    #[must_use]
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = flag;
        self
    }

    /// Returns the cancellation flag; setting it stops the run at the next
    /// set boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    /// Returns the store this pipeline writes to.
    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancel.load(Ordering::SeqCst) {
            warn!("Run cancelled, nothing written");
            return Err(PipelineError::Cancelled);
        }
        Ok(())
    }

    /// Executes one run.
    #[instrument(skip(self), fields(data_dir = %self.store.root().display()))]
    pub async fn run(&self) -> Result<RunReport, PipelineError> {
        let today = self.clock.today();
        let mut report = RunReport::new(today);

        let sets = self
            .catalog
            .fetch_sets()
            .await
            .map_err(PipelineError::Catalog)?;

        let previous: BTreeMap<SetId, String> = match self.store.read_latest_summaries().await {
            Ok(rows) => rows.into_iter().map(|s| (s.set_id, s.set_name)).collect(),
            Err(e) => {
                warn!(error = %e, "Could not read previous summary, treating every set as new");
                BTreeMap::new()
            }
        };

        let mut aggregator = SnapshotAggregator::new();
        for (index, set) in sets.iter().enumerate() {
            self.check_cancelled()?;
            if index > 0 && !self.inter_set_delay.is_zero() {
                self.sleeper.sleep(self.inter_set_delay).await;
            }

            let outcome = self.process_set(set, &mut aggregator).await;
            info!(
                set = %set.name,
                index = index + 1,
                total = sets.len(),
                status = outcome.label(),
                "Processed set"
            );
            report.sets.push(SetReport {
                set_id: set.id,
                set_name: set.name.clone(),
                is_new: !previous.contains_key(&set.id),
                outcome,
            });
        }
        self.check_cancelled()?;

        let catalogued: HashSet<SetId> = sets.iter().map(|s| s.id).collect();
        report.absent = previous
            .into_iter()
            .filter(|(id, _)| !catalogued.contains(id))
            .map(|(set_id, set_name)| AbsentSet { set_id, set_name })
            .collect();

        let snapshot = aggregator.into_snapshot();
        report.snapshot_cards = snapshot.cards.len();

        let _lock = self.store.lock_history()?;
        let existing = self.store.load_history().await?;

        // A set missing from the previous summary may still have history from
        // earlier runs, e.g. when it failed last time.
        let known = existing.set_names();
        for entry in report.sets.iter_mut().filter(|s| s.is_new) {
            entry.is_new = !known.contains(entry.set_name.as_str());
        }

        self.store.write_latest(&snapshot).await?;
        report.archived = self.store.archive(&snapshot, today).await?;

        let history = PriceHistory::merge(existing, &snapshot.observations(today), today);
        self.store.save_history(&history).await?;
        report.history_rows = history.len();
        report.history_dates = history.dates().len();

        info!(
            succeeded = report.succeeded().count(),
            skipped = report.skipped().count(),
            failed = report.failed().count(),
            absent = report.absent.len(),
            history_rows = report.history_rows,
            "Run complete"
        );
        Ok(report)
    }

    /// Fetches, prices, and aggregates one set. Failed sets leave no trace in
    /// the snapshot.
    async fn process_set(&self, set: &CardSet, aggregator: &mut SnapshotAggregator) -> SetOutcome {
        let fetched = match self.cards.get_cards(set).await {
            Ok(fetched) => fetched,
            Err(e) => {
                warn!(set = %set.name, error = %e, "Skipping set");
                return SetOutcome::Failed {
                    reason: e.to_string(),
                };
            }
        };

        if fetched.is_empty() {
            aggregator.record_set(set, Vec::new());
            return SetOutcome::SkippedEmpty {
                attempts: fetched.empty_attempts,
            };
        }

        let mut cards = Vec::with_capacity(fetched.cards.len());
        for raw in &fetched.cards {
            let price = self.prices.extract_price(raw).await;
            cards.push(Card::from_raw(raw, set, price));
        }

        let priced = cards.iter().filter(|c| c.price.is_some()).count();
        let summary = aggregator.record_set(set, cards);
        SetOutcome::Succeeded {
            cards: summary.total_cards,
            priced,
        }
    }
}
