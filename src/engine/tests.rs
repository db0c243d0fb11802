//! Tests for engine module

use super::*;
use crate::http::BackoffPolicy;
use crate::pagination::PaginationStyle;
use crate::types::{Position, Record};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::tempdir;

// ============================================================================
// Test doubles
// ============================================================================

fn ts(s: &str) -> Timestamp {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn records(prefix: &str, count: usize) -> Vec<Record> {
    (0..count)
        .map(|i| Record::new(format!("{prefix}{i}"), "2024-03-01T10:00:00.000Z"))
        .collect()
}

/// Replays a fixed list of responses and records every request
#[derive(Default)]
struct ScriptedFetcher {
    responses: Mutex<VecDeque<Result<Page>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl ScriptedFetcher {
    fn new(responses: Vec<Result<Page>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<PageRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn fetch(&self, request: &PageRequest) -> Result<Page> {
        self.requests.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Page::default()))
    }
}

/// Offset-style API over an in-memory, newest-first event list
struct SimulatedApi {
    events: Mutex<Vec<Record>>,
    /// Return records older than `from` too, like an imprecise API filter
    ignore_from: bool,
}

impl SimulatedApi {
    fn new(events: Vec<Record>) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(events),
            ignore_from: false,
        })
    }

    fn imprecise(events: Vec<Record>) -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(events),
            ignore_from: true,
        })
    }

    fn publish(&self, record: Record) {
        self.events.lock().unwrap().insert(0, record);
    }
}

#[async_trait]
impl PageFetcher for SimulatedApi {
    async fn fetch(&self, request: &PageRequest) -> Result<Page> {
        let offset = request.position.offset().unwrap_or(0) as usize;
        let matching: Vec<Record> = self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|r| {
                let created = r.created_at().unwrap();
                created <= request.window.to && (self.ignore_from || created >= request.window.from)
            })
            .cloned()
            .collect();

        Ok(Page::new(
            matching
                .into_iter()
                .skip(offset)
                .take(request.page_size as usize)
                .collect(),
        ))
    }
}

/// Collects emitted records
#[derive(Default)]
struct CollectingEmitter {
    records: Mutex<Vec<Record>>,
    fail_ids: Vec<String>,
}

impl CollectingEmitter {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn failing_on(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            records: Mutex::new(Vec::new()),
            fail_ids: ids.iter().map(ToString::to_string).collect(),
        })
    }

    fn ids(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }
}

#[async_trait]
impl RecordEmitter for CollectingEmitter {
    async fn emit(&self, record: &Record) -> Result<()> {
        if self.fail_ids.contains(&record.id) {
            return Err(Error::emit(&record.id, "sink unavailable"));
        }
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}

/// Records requested waits instead of sleeping
#[derive(Default)]
struct RecordingSleeper {
    sleeps: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.sleeps.lock().unwrap().push(duration);
    }
}

struct Harness {
    emitter: Arc<CollectingEmitter>,
    sleeper: Arc<RecordingSleeper>,
    store: CheckpointStore,
}

impl Harness {
    fn new(store: CheckpointStore) -> Self {
        Self {
            emitter: CollectingEmitter::new(),
            sleeper: Arc::new(RecordingSleeper::default()),
            store,
        }
    }

    fn exporter(
        &self,
        fetcher: Arc<dyn PageFetcher>,
        style: PaginationStyle,
        page_size: u32,
    ) -> Exporter {
        Exporter::new(
            fetcher,
            self.emitter.clone(),
            self.store.clone(),
            style,
        )
        .with_settings(ExportSettings::new().with_page_size(page_size))
        .with_sleeper(self.sleeper.clone())
    }

    async fn checkpoint(&self) -> Checkpoint {
        self.store.current().await.expect("checkpoint persisted")
    }
}

const NOW: &str = "2024-03-10T00:00:00Z";

// ============================================================================
// Settings / Stats Tests
// ============================================================================

#[test]
fn test_export_settings_default() {
    let settings = ExportSettings::default();
    assert_eq!(settings.page_size, 1000);
    assert_eq!(settings.lookback, chrono::Duration::days(365));
    assert!(settings.filter.is_empty());
    assert!(settings.from_override.is_none());
}

#[test]
fn test_export_stats_add_page() {
    let mut stats = ExportStats::new();
    stats.add_page(10);
    stats.add_page(4);
    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.records_fetched, 14);
}

// ============================================================================
// Offset Style
// ============================================================================

#[tokio::test]
async fn test_offset_style_three_pages_then_reset() {
    let harness = Harness::new(CheckpointStore::in_memory());
    let fetcher = ScriptedFetcher::new(vec![
        Ok(Page::new(records("a", 1000))),
        Ok(Page::new(records("b", 1000))),
        Ok(Page::new(records("c", 400))),
    ]);

    let stats = harness
        .exporter(fetcher.clone(), PaginationStyle::Offset, 1000)
        .run(ts(NOW))
        .await
        .unwrap();

    let offsets: Vec<Option<u64>> = fetcher
        .requests()
        .iter()
        .map(|r| r.position.offset())
        .collect();
    assert_eq!(offsets, vec![Some(0), Some(1000), Some(2000)]);

    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.records_emitted, 2400);

    let checkpoint = harness.checkpoint().await;
    assert_eq!(checkpoint.position, Position::Offset(0));
    assert!(checkpoint.window.is_none());
}

#[tokio::test]
async fn test_short_page_check_follows_requested_page_size() {
    let harness = Harness::new(CheckpointStore::in_memory());
    let events: Vec<Record> = (0..250)
        .map(|i| {
            let created = ts("2024-03-09T00:00:00Z") - chrono::Duration::seconds(i);
            Record::new(format!("e{i}"), format_millis(&created))
        })
        .collect();
    let api = SimulatedApi::new(events);

    // Default settings first, page size changed afterwards
    let stats = Exporter::new(
        api,
        harness.emitter.clone(),
        harness.store.clone(),
        PaginationStyle::Offset,
    )
    .with_settings(ExportSettings::new().with_page_size(100))
    .with_sleeper(harness.sleeper.clone())
    .run(ts(NOW))
    .await
    .unwrap();

    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.records_emitted, 250);
    assert_eq!(harness.emitter.ids().len(), 250);
    assert_eq!(harness.checkpoint().await.position, Position::Offset(0));
}

#[tokio::test]
async fn test_huge_lookback_does_not_panic() {
    let harness = Harness::new(CheckpointStore::in_memory());
    let fetcher = ScriptedFetcher::new(vec![]);

    harness
        .exporter(fetcher.clone(), PaginationStyle::Offset, 1000)
        .with_settings(ExportSettings::new().with_lookback(chrono::Duration::days(200_000_000)))
        .run(ts(NOW))
        .await
        .unwrap();

    assert_eq!(
        fetcher.requests()[0].window.from,
        DateTime::<Utc>::UNIX_EPOCH
    );
}

#[tokio::test]
async fn test_first_run_uses_lookback_window() {
    let harness = Harness::new(CheckpointStore::in_memory());
    let fetcher = ScriptedFetcher::new(vec![]);

    harness
        .exporter(fetcher.clone(), PaginationStyle::Offset, 1000)
        .with_settings(
            ExportSettings::new().with_lookback(chrono::Duration::days(7)),
        )
        .run(ts(NOW))
        .await
        .unwrap();

    let request = &fetcher.requests()[0];
    assert_eq!(request.window, Window::new(ts("2024-03-03T00:00:00Z"), ts(NOW)));
}

#[tokio::test]
async fn test_inter_page_delay_between_successful_pages() {
    let harness = Harness::new(CheckpointStore::in_memory());
    let fetcher = ScriptedFetcher::new(vec![
        Ok(Page::new(records("a", 2))),
        Ok(Page::new(records("b", 2))),
        Ok(Page::new(records("c", 1))),
    ]);

    harness
        .exporter(fetcher, PaginationStyle::Offset, 2)
        .with_backoff(BackoffPolicy::new().inter_page_delay(Duration::from_millis(300)))
        .run(ts(NOW))
        .await
        .unwrap();

    assert_eq!(
        harness.sleeper.sleeps(),
        vec![Duration::from_millis(300), Duration::from_millis(300)]
    );
}

#[tokio::test]
async fn test_out_of_range_records_count_toward_offset() {
    let harness = Harness::new(CheckpointStore::in_memory_with(Checkpoint::new(
        Position::Offset(0),
        ts("2024-03-01T00:00:00Z"),
    )));
    let fetcher = ScriptedFetcher::new(vec![
        Ok(Page::new(vec![
            Record::new("new", "2024-03-05T00:00:00.000Z"),
            Record::new("stale", "2024-02-01T00:00:00.000Z"),
        ])),
        Ok(Page::new(vec![])),
    ]);

    let stats = harness
        .exporter(fetcher.clone(), PaginationStyle::Offset, 2)
        .run(ts(NOW))
        .await
        .unwrap();

    assert_eq!(harness.emitter.ids(), vec!["new"]);
    assert_eq!(stats.records_skipped, 1);
    assert_eq!(fetcher.requests()[1].position, Position::Offset(2));
}

// ============================================================================
// Cursor Style
// ============================================================================

#[tokio::test]
async fn test_cursor_style_stops_without_continuation() {
    let harness = Harness::new(CheckpointStore::in_memory());
    let fetcher = ScriptedFetcher::new(vec![
        Ok(Page::new(records("a", 3)).with_next_cursor("c1")),
        Ok(Page::new(records("b", 3)).with_next_cursor("c2")),
        Ok(Page::new(records("c", 3))),
        // Never requested
        Ok(Page::new(records("d", 3))),
    ]);

    let stats = harness
        .exporter(fetcher.clone(), PaginationStyle::Cursor, 100)
        .run(ts(NOW))
        .await
        .unwrap();

    let cursors: Vec<Position> = fetcher.requests().into_iter().map(|r| r.position).collect();
    assert_eq!(
        cursors,
        vec![
            Position::Cursor(None),
            Position::Cursor(Some("c1".into())),
            Position::Cursor(Some("c2".into())),
        ]
    );
    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.records_emitted, 9);
    assert_eq!(harness.checkpoint().await.position, Position::Cursor(None));
}

#[tokio::test]
async fn test_cursor_persisted_after_each_page() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let harness = Harness::new(CheckpointStore::new(&path));
    let fetcher = ScriptedFetcher::new(vec![
        Ok(Page::new(records("a", 1)).with_next_cursor("c1")),
        Err(Error::http_status(500, "boom")),
    ]);

    let result = harness
        .exporter(fetcher, PaginationStyle::Cursor, 100)
        .run(ts(NOW))
        .await;
    assert!(result.is_err());

    let stored = CheckpointStore::new(&path).try_load().await.unwrap().unwrap();
    assert_eq!(stored.position, Position::Cursor(Some("c1".into())));
    assert!(stored.window.is_some());
}

// ============================================================================
// Watermark / Resume
// ============================================================================

#[tokio::test]
async fn test_boundary_record_not_reemitted() {
    let harness = Harness::new(CheckpointStore::in_memory_with(Checkpoint::new(
        Position::Offset(0),
        ts("2024-03-01T00:00:00Z"),
    )));
    let boundary = Record::new("boundary", "2024-03-05T12:00:00.000+0000");

    // First run sees the boundary record as newest
    let first = ScriptedFetcher::new(vec![Ok(Page::new(vec![
        boundary.clone(),
        Record::new("older", "2024-03-04T00:00:00.000Z"),
    ]))]);
    harness
        .exporter(first, PaginationStyle::Offset, 1000)
        .run(ts(NOW))
        .await
        .unwrap();

    assert_eq!(
        harness.checkpoint().await.watermark,
        ts("2024-03-05T12:00:00.001Z")
    );

    // The API hands the same record back on the next run
    let second = ScriptedFetcher::new(vec![Ok(Page::new(vec![boundary]))]);
    harness
        .exporter(second, PaginationStyle::Offset, 1000)
        .run(ts("2024-03-11T00:00:00Z"))
        .await
        .unwrap();

    assert_eq!(harness.emitter.ids(), vec!["boundary", "older"]);
    assert_eq!(
        harness.checkpoint().await.watermark,
        ts("2024-03-05T12:00:00.001Z")
    );
}

#[tokio::test]
async fn test_second_run_without_new_data_is_a_fixpoint() {
    let harness = Harness::new(CheckpointStore::in_memory_with(Checkpoint::new(
        Position::Offset(0),
        ts("2024-03-01T00:00:00Z"),
    )));
    let api = SimulatedApi::new(vec![
        Record::new("3", "2024-03-03T00:00:00.000Z"),
        Record::new("2", "2024-03-02T00:00:00.000Z"),
        Record::new("1", "2024-03-01T00:00:00.000Z"),
    ]);

    harness
        .exporter(api.clone(), PaginationStyle::Offset, 2)
        .run(ts(NOW))
        .await
        .unwrap();
    let after_first = harness.checkpoint().await;

    let stats = harness
        .exporter(api, PaginationStyle::Offset, 2)
        .run(ts("2024-03-10T01:00:00Z"))
        .await
        .unwrap();

    assert_eq!(harness.emitter.ids(), vec!["3", "2", "1"]);
    assert_eq!(stats.records_emitted, 0);
    assert_eq!(harness.checkpoint().await, after_first);
}

#[tokio::test]
async fn test_imprecise_api_filter_does_not_duplicate() {
    let harness = Harness::new(CheckpointStore::in_memory_with(Checkpoint::new(
        Position::Offset(0),
        ts("2024-03-01T00:00:00Z"),
    )));
    let api = SimulatedApi::imprecise(vec![
        Record::new("2", "2024-03-02T00:00:00.000Z"),
        Record::new("1", "2024-03-01T00:00:00.000Z"),
    ]);

    harness
        .exporter(api.clone(), PaginationStyle::Offset, 10)
        .run(ts(NOW))
        .await
        .unwrap();

    api.publish(Record::new("3", "2024-03-10T00:30:00.000Z"));

    harness
        .exporter(api, PaginationStyle::Offset, 10)
        .run(ts("2024-03-10T01:00:00Z"))
        .await
        .unwrap();

    assert_eq!(harness.emitter.ids(), vec!["2", "1", "3"]);
    assert_eq!(
        harness.checkpoint().await.watermark,
        ts("2024-03-10T00:30:00.001Z")
    );
}

#[tokio::test]
async fn test_new_data_between_runs_is_emitted_once() {
    let harness = Harness::new(CheckpointStore::in_memory_with(Checkpoint::new(
        Position::Offset(0),
        ts("2024-03-01T00:00:00Z"),
    )));
    let api = SimulatedApi::new(vec![Record::new("1", "2024-03-02T00:00:00.000Z")]);

    harness
        .exporter(api.clone(), PaginationStyle::Offset, 2)
        .run(ts(NOW))
        .await
        .unwrap();

    api.publish(Record::new("2", "2024-03-10T00:10:00.000Z"));
    api.publish(Record::new("3", "2024-03-10T00:20:00.000Z"));
    api.publish(Record::new("4", "2024-03-10T00:30:00.000Z"));

    harness
        .exporter(api, PaginationStyle::Offset, 2)
        .run(ts("2024-03-10T01:00:00Z"))
        .await
        .unwrap();

    assert_eq!(harness.emitter.ids(), vec!["1", "4", "3", "2"]);
}

#[tokio::test]
async fn test_empty_result_leaves_watermark() {
    let start = Checkpoint::new(Position::Offset(0), ts("2024-03-01T00:00:00Z"));
    let harness = Harness::new(CheckpointStore::in_memory_with(start.clone()));
    let fetcher = ScriptedFetcher::new(vec![Ok(Page::default())]);

    let stats = harness
        .exporter(fetcher, PaginationStyle::Offset, 1000)
        .run(ts(NOW))
        .await
        .unwrap();

    assert_eq!(stats.records_fetched, 0);
    assert_eq!(harness.checkpoint().await, start);
}

#[tokio::test]
async fn test_empty_result_does_not_rewrite_checkpoint_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("state.json");
    let raw = r#"{"offset":0,"last_event_date":"2024-03-01T00:00:00Z"}"#;
    std::fs::write(&path, raw).unwrap();

    let harness = Harness::new(CheckpointStore::new(&path));
    let fetcher = ScriptedFetcher::new(vec![Ok(Page::default())]);

    harness
        .exporter(fetcher, PaginationStyle::Offset, 1000)
        .run(ts(NOW))
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(&path).unwrap(), raw);
}

#[tokio::test]
async fn test_interrupted_pass_resumes_in_stored_window() {
    let stored_window = Window::new(ts("2024-03-01T00:00:00Z"), ts("2024-03-05T00:00:00Z"));
    let mut start = Checkpoint::new(Position::Offset(0), ts("2024-03-04T00:00:00.001Z"));
    start.continue_pass(Position::Offset(2000), stored_window);

    let harness = Harness::new(CheckpointStore::in_memory_with(start));
    let fetcher = ScriptedFetcher::new(vec![Ok(Page::new(vec![Record::new(
        "late",
        "2024-03-03T00:00:00.000Z",
    )]))]);

    harness
        .exporter(fetcher.clone(), PaginationStyle::Offset, 1000)
        .run(ts(NOW))
        .await
        .unwrap();

    let request = &fetcher.requests()[0];
    assert_eq!(request.window, stored_window);
    assert_eq!(request.position, Position::Offset(2000));

    // Continuation pages never move the watermark
    let checkpoint = harness.checkpoint().await;
    assert_eq!(checkpoint.watermark, ts("2024-03-04T00:00:00.001Z"));
    assert_eq!(checkpoint.position, Position::Offset(0));
    assert!(checkpoint.window.is_none());
    assert_eq!(harness.emitter.ids(), vec!["late"]);
}

#[tokio::test]
async fn test_from_override_replaces_checkpoint() {
    let mut stored = Checkpoint::new(Position::Offset(0), ts("2024-03-08T00:00:00Z"));
    stored.continue_pass(
        Position::Offset(3000),
        Window::new(ts("2024-03-07T00:00:00Z"), ts("2024-03-08T00:00:00Z")),
    );
    let harness = Harness::new(CheckpointStore::in_memory_with(stored));
    let fetcher = ScriptedFetcher::new(vec![]);

    harness
        .exporter(fetcher.clone(), PaginationStyle::Offset, 1000)
        .with_settings(ExportSettings::new().with_from(ts("2024-01-01T00:00:00Z")))
        .run(ts(NOW))
        .await
        .unwrap();

    let request = &fetcher.requests()[0];
    assert_eq!(request.position, Position::Offset(0));
    assert_eq!(request.window.from, ts("2024-01-01T00:00:00Z"));
}

#[tokio::test]
async fn test_position_from_other_style_is_reset() {
    let mut stored = Checkpoint::new(Position::Offset(0), ts("2024-03-01T00:00:00Z"));
    stored.continue_pass(
        Position::Offset(3000),
        Window::new(ts("2024-02-01T00:00:00Z"), ts("2024-02-02T00:00:00Z")),
    );
    let harness = Harness::new(CheckpointStore::in_memory_with(stored));
    let fetcher = ScriptedFetcher::new(vec![]);

    harness
        .exporter(fetcher.clone(), PaginationStyle::Cursor, 100)
        .run(ts(NOW))
        .await
        .unwrap();

    let request = &fetcher.requests()[0];
    assert_eq!(request.position, Position::Cursor(None));
    assert_eq!(
        request.window,
        Window::new(ts("2024-03-01T00:00:00Z"), ts(NOW))
    );
}

// ============================================================================
// Throttling
// ============================================================================

#[tokio::test]
async fn test_throttle_waits_retry_after_and_retries_same_page() {
    let harness = Harness::new(CheckpointStore::in_memory());
    let fetcher = ScriptedFetcher::new(vec![
        Ok(Page::new(records("a", 2))),
        Err(Error::RateLimited {
            retry_after_seconds: Some(5),
        }),
        Ok(Page::new(records("b", 1))),
    ]);

    let stats = harness
        .exporter(fetcher.clone(), PaginationStyle::Offset, 2)
        .with_backoff(BackoffPolicy::new().inter_page_delay(Duration::ZERO))
        .run(ts(NOW))
        .await
        .unwrap();

    let positions: Vec<Position> = fetcher.requests().into_iter().map(|r| r.position).collect();
    assert_eq!(
        positions,
        vec![Position::Offset(0), Position::Offset(2), Position::Offset(2)]
    );
    assert_eq!(
        harness.sleeper.sleeps(),
        vec![Duration::ZERO, Duration::from_secs(5)]
    );
    assert_eq!(stats.throttles, 1);
    assert_eq!(harness.emitter.ids(), vec!["a0", "a1", "b0"]);
}

#[tokio::test]
async fn test_throttle_without_retry_after_uses_fallback() {
    let harness = Harness::new(CheckpointStore::in_memory());
    let fetcher = ScriptedFetcher::new(vec![
        Err(Error::RateLimited {
            retry_after_seconds: None,
        }),
        Err(Error::RateLimited {
            retry_after_seconds: None,
        }),
        Ok(Page::default()),
    ]);

    harness
        .exporter(fetcher.clone(), PaginationStyle::Offset, 1000)
        .run(ts(NOW))
        .await
        .unwrap();

    assert_eq!(
        harness.sleeper.sleeps(),
        vec![Duration::from_secs(50), Duration::from_secs(50)]
    );
    assert_eq!(fetcher.requests().len(), 3);
}

#[tokio::test]
async fn test_throttle_limit_aborts_run() {
    let harness = Harness::new(CheckpointStore::in_memory());
    let fetcher = ScriptedFetcher::new(
        (0..5)
            .map(|_| {
                Err(Error::RateLimited {
                    retry_after_seconds: Some(1),
                })
            })
            .collect(),
    );

    let err = harness
        .exporter(fetcher.clone(), PaginationStyle::Offset, 1000)
        .with_backoff(BackoffPolicy::new().max_throttles(2))
        .run(ts(NOW))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ThrottleLimitExceeded { throttles: 3 }));
    assert_eq!(fetcher.requests().len(), 3);
    assert!(harness.emitter.ids().is_empty());
}

// ============================================================================
// Failure Handling
// ============================================================================

#[tokio::test]
async fn test_fatal_error_keeps_last_checkpoint() {
    let harness = Harness::new(CheckpointStore::in_memory_with(Checkpoint::new(
        Position::Offset(0),
        ts("2024-03-01T00:00:00Z"),
    )));
    let fetcher = ScriptedFetcher::new(vec![
        Ok(Page::new(vec![
            Record::new("2", "2024-03-09T00:00:00.000Z"),
            Record::new("1", "2024-03-08T00:00:00.000Z"),
        ])),
        Err(Error::http_status(401, "unauthorized")),
    ]);

    let err = harness
        .exporter(fetcher, PaginationStyle::Offset, 2)
        .run(ts(NOW))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::HttpStatus { status: 401, .. }));

    let checkpoint = harness.checkpoint().await;
    assert_eq!(checkpoint.position, Position::Offset(2));
    assert_eq!(checkpoint.watermark, ts("2024-03-09T00:00:00.001Z"));
    assert_eq!(
        checkpoint.window,
        Some(Window::new(ts("2024-03-01T00:00:00Z"), ts(NOW)))
    );
}

#[tokio::test]
async fn test_emit_failure_does_not_abort() {
    let mut harness = Harness::new(CheckpointStore::in_memory());
    harness.emitter = CollectingEmitter::failing_on(&["a1"]);
    let fetcher = ScriptedFetcher::new(vec![Ok(Page::new(records("a", 3)))]);

    let stats = harness
        .exporter(fetcher, PaginationStyle::Offset, 1000)
        .run(ts(NOW))
        .await
        .unwrap();

    assert_eq!(harness.emitter.ids(), vec!["a0", "a2"]);
    assert_eq!(stats.emit_failures, 1);
    assert_eq!(stats.records_emitted, 2);
}

#[tokio::test]
async fn test_checkpoint_write_failure_does_not_abort() {
    let dir = tempdir().unwrap();
    let harness = Harness::new(CheckpointStore::new(
        dir.path().join("missing").join("state.json"),
    ));
    let fetcher = ScriptedFetcher::new(vec![
        Ok(Page::new(records("a", 2))),
        Ok(Page::new(records("b", 1))),
    ]);

    let stats = harness
        .exporter(fetcher, PaginationStyle::Offset, 2)
        .run(ts(NOW))
        .await
        .unwrap();

    assert_eq!(stats.checkpoint_failures, 2);
    assert_eq!(stats.records_emitted, 3);
}
