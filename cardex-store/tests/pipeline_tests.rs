//! End-to-end runs against scripted HTTP, a recording sleeper, and a fixed clock.

use cardex_core::{FixedClock, SetOutcome};
use cardex_fetch::mock::{RecordingSleeper, ScriptedFetcher};
use cardex_fetch::{Endpoints, FetchError, RetryPolicy};
use cardex_store::{Pipeline, PipelineError, PipelineSettings, SnapshotStore, StoreError};
use chrono::NaiveDate;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tempfile::TempDir;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
}

fn settings(lookup: bool) -> PipelineSettings {
    PipelineSettings {
        endpoints: Endpoints {
            catalog_url: "http://test/sets.json".into(),
            cards_url: "http://test/api/cards".into(),
            price_url: "http://test/api/stats?id={id}".into(),
        },
        retry: RetryPolicy::new(5)
            .with_base_delay(Duration::from_secs(5))
            .with_escalation(Duration::from_secs(600), 3),
        lookup: lookup.then(|| {
            RetryPolicy::new(2)
                .with_base_delay(Duration::from_secs(5))
                .with_escalation(Duration::ZERO, 0)
        }),
        empty_result_attempts: 2,
        inter_set_delay: Duration::from_secs(5),
    }
}

fn catalog(sets: &[(i64, &str)]) -> Value {
    let sets: Vec<Value> = sets
        .iter()
        .map(|(id, name)| json!({"id": id, "name": name, "code": "X", "series": "Base", "language": "ENGLISH", "release_date": "1999"}))
        .collect();
    json!({"pageProps": {"setInfoArr": sets}})
}

fn cards(ids: &[i64]) -> Value {
    Value::Array(
        ids.iter()
            .map(|id| json!({"id": id, "name": format!("Card {id}"), "num": id.to_string(), "stats": []}))
            .collect(),
    )
}

struct Harness {
    dir: TempDir,
    sleeper: Arc<RecordingSleeper>,
}

impl Harness {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            sleeper: Arc::new(RecordingSleeper::new()),
        }
    }

    fn store(&self) -> SnapshotStore {
        SnapshotStore::new(self.dir.path())
    }

    fn pipeline(&self, http: Arc<ScriptedFetcher>, date: NaiveDate, lookup: bool) -> Pipeline {
        Pipeline::new(
            http,
            self.sleeper.clone(),
            Arc::new(FixedClock::new(date)),
            self.store(),
            settings(lookup),
        )
    }
}

fn scenario_a() -> Arc<ScriptedFetcher> {
    Arc::new(
        ScriptedFetcher::new()
            .on_ok("sets.json", catalog(&[(10, "Base Set")]))
            .on_ok("api/cards", cards(&[1, 2]))
            .on_ok("stats?id=1", json!([{"avg": 3.5}]))
            .on_ok("stats?id=2", json!([])),
    )
}

#[tokio::test]
async fn test_single_set_with_one_absent_price() {
    let h = Harness::new();
    let report = h.pipeline(scenario_a(), day(25), true).run().await.unwrap();

    assert_eq!(report.snapshot_cards, 2);
    assert_eq!(report.history_rows, 2);
    assert!(report.archived);
    assert_eq!(
        report.sets[0].outcome,
        SetOutcome::Succeeded { cards: 2, priced: 1 }
    );

    let summaries = h.store().read_latest_summaries().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].total_cards, 2);
    assert_eq!(summaries[0].total_value, 3.5);
    assert_eq!(summaries[0].avg_value, 1.75);

    let latest = h.store().read_latest_cards().await.unwrap();
    assert_eq!(latest[1].price, None);

    let history = h.store().load_history().await.unwrap();
    assert_eq!(history.rows_on(day(25)), 2);
    assert_eq!(history.get(2, day(25)).unwrap().price, None);
}

#[tokio::test]
async fn test_rate_limited_cards_back_off_twice() {
    let h = Harness::new();
    let http = Arc::new(
        ScriptedFetcher::new()
            .on_ok("sets.json", catalog(&[(10, "Base Set")]))
            .on(
                "api/cards",
                [
                    Err(FetchError::RateLimited { retry_after: Some(30) }),
                    Err(FetchError::RateLimited { retry_after: None }),
                    Ok(cards(&[1])),
                ],
            ),
    );

    let report = h.pipeline(http.clone(), day(25), false).run().await.unwrap();

    assert_eq!(report.succeeded().count(), 1);
    assert_eq!(http.request_count("api/cards"), 3);
    assert_eq!(
        h.sleeper.sleeps(),
        vec![Duration::from_secs(5), Duration::from_secs(10)]
    );
}

#[tokio::test]
async fn test_empty_set_is_skipped_not_failed() {
    let h = Harness::new();
    let http = Arc::new(
        ScriptedFetcher::new()
            .on_ok("sets.json", catalog(&[(10, "Base Set"), (11, "Promo")]))
            .on_ok("set_name=Base+Set", cards(&[1]))
            .on_ok("set_name=Promo", json!([])),
    );

    let report = h.pipeline(http.clone(), day(25), false).run().await.unwrap();

    assert_eq!(http.request_count("set_name=Promo"), 2);
    assert_eq!(report.sets[1].outcome, SetOutcome::SkippedEmpty { attempts: 2 });
    assert_eq!(report.sets[1].outcome.label(), "skipped: empty");
    assert_eq!(report.failed().count(), 0);

    let summaries = h.store().read_latest_summaries().await.unwrap();
    assert_eq!(summaries.len(), 2);
    assert_eq!(summaries[1].total_cards, 0);
    assert_eq!(summaries[1].avg_value, 0.0);
}

#[tokio::test]
async fn test_same_day_rerun_keeps_history_rows() {
    let h = Harness::new();

    let first = h.pipeline(scenario_a(), day(25), true).run().await.unwrap();
    let rows_after_first = h.store().load_history().await.unwrap().rows_on(day(25));

    let second = h.pipeline(scenario_a(), day(25), true).run().await.unwrap();
    let history = h.store().load_history().await.unwrap();

    assert_eq!(history.rows_on(day(25)), rows_after_first);
    assert_eq!(second.history_rows, first.history_rows);
    assert!(!second.archived);
    assert!(!second.sets[0].is_new);
}

#[tokio::test]
async fn test_next_day_extends_history() {
    let h = Harness::new();

    h.pipeline(scenario_a(), day(25), true).run().await.unwrap();
    let report = h.pipeline(scenario_a(), day(26), true).run().await.unwrap();

    assert_eq!(report.history_rows, 4);
    assert_eq!(report.history_dates, 2);
    assert!(h.store().archive_dir(day(25)).exists());
    assert!(h.store().archive_dir(day(26)).exists());
}

#[tokio::test]
async fn test_catalog_exhaustion_is_fatal_and_writes_nothing() {
    let h = Harness::new();
    let http = Arc::new(
        ScriptedFetcher::new().on("sets.json", [Err(FetchError::Hard("bad catalog".into()))]),
    );

    let err = h.pipeline(http, day(25), false).run().await.unwrap_err();

    assert!(matches!(err, PipelineError::Catalog(_)));
    assert!(!h.store().latest_cards_path().exists());
    assert!(!h.store().history_path().exists());
}

#[tokio::test]
async fn test_failed_set_is_reported_and_excluded() {
    let h = Harness::new();
    let http = Arc::new(
        ScriptedFetcher::new()
            .on_ok("sets.json", catalog(&[(10, "Base Set"), (12, "Broken")]))
            .on_ok("set_name=Base+Set", cards(&[1]))
            .on_ok("set_name=Broken", json!({"error": "schema changed"})),
    );

    let report = h.pipeline(http, day(25), false).run().await.unwrap();

    assert_eq!(report.failed().count(), 1);
    assert_eq!(report.succeeded().count(), 1);
    let summaries = h.store().read_latest_summaries().await.unwrap();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].set_id, 10);
}

#[tokio::test]
async fn test_inter_set_delay_between_sets_only() {
    let h = Harness::new();
    let http = Arc::new(
        ScriptedFetcher::new()
            .on_ok("sets.json", catalog(&[(10, "A"), (11, "B"), (12, "C")]))
            .on_ok("api/cards", cards(&[1])),
    );

    h.pipeline(http, day(25), false).run().await.unwrap();

    assert_eq!(h.sleeper.sleeps(), vec![Duration::from_secs(5); 2]);
}

#[tokio::test]
async fn test_new_and_absent_sets() {
    let h = Harness::new();
    let first = Arc::new(
        ScriptedFetcher::new()
            .on_ok("sets.json", catalog(&[(10, "Base Set"), (11, "Jungle")]))
            .on_ok("api/cards", cards(&[1])),
    );
    let report = h.pipeline(first, day(25), false).run().await.unwrap();
    assert_eq!(report.new_sets().count(), 2);

    let second = Arc::new(
        ScriptedFetcher::new()
            .on_ok("sets.json", catalog(&[(10, "Base Set"), (13, "Fossil")]))
            .on_ok("api/cards", cards(&[1])),
    );
    let report = h.pipeline(second, day(26), false).run().await.unwrap();

    let new: Vec<_> = report.new_sets().map(|s| s.set_id).collect();
    assert_eq!(new, vec![13]);
    assert_eq!(report.absent.len(), 1);
    assert_eq!(report.absent[0].set_name, "Jungle");
}

#[tokio::test]
async fn test_cancelled_run_writes_nothing() {
    let h = Harness::new();
    let pipeline = h.pipeline(scenario_a(), day(25), true);
    pipeline.cancel_flag().store(true, Ordering::SeqCst);

    let err = pipeline.run().await.unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled));
    assert!(!h.store().latest_cards_path().exists());
    assert!(!h.store().history_path().exists());
}

#[tokio::test]
async fn test_locked_history_fails_before_writing() {
    let h = Harness::new();
    let _held = h.store().lock_history().unwrap();

    let err = h.pipeline(scenario_a(), day(25), true).run().await.unwrap_err();

    assert!(matches!(err, PipelineError::Store(StoreError::Locked(_))));
    assert!(!h.store().history_path().exists());
    assert!(!h.store().latest_cards_path().exists());
}

#[tokio::test]
async fn test_failed_set_is_not_absent_and_not_new_after_recovery() {
    let h = Harness::new();
    let routes = |base: Value| {
        Arc::new(
            ScriptedFetcher::new()
                .on_ok("sets.json", catalog(&[(1, "Base"), (2, "Jungle")]))
                .on_ok("set_name=Base", base)
                .on_ok("set_name=Jungle", cards(&[20])),
        )
    };

    let first = h.pipeline(routes(cards(&[10])), day(1), false).run().await.unwrap();
    assert_eq!(first.new_sets().count(), 2);

    let failing = h
        .pipeline(routes(json!({"error": "schema changed"})), day(2), false)
        .run()
        .await
        .unwrap();
    assert!(matches!(failing.sets[0].outcome, SetOutcome::Failed { .. }));
    assert!(!failing.sets[0].is_new);
    assert!(failing.absent.is_empty());

    let recovered = h.pipeline(routes(cards(&[10])), day(3), false).run().await.unwrap();
    assert!(matches!(recovered.sets[0].outcome, SetOutcome::Succeeded { .. }));
    assert_eq!(recovered.new_sets().count(), 0);
    assert!(recovered.absent.is_empty());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn test_lock_left_by_dead_run_is_reclaimed() {
    let h = Harness::new();
    std::fs::write(h.store().lock_path(), "999999\n").unwrap();

    for d in 1..=3 {
        let report = h.pipeline(scenario_a(), day(d), true).run().await.unwrap();
        assert_eq!(report.history_dates, d as usize);
    }
    assert!(!h.store().lock_path().exists());
}
