//! Overlap Join Tests
//!
//! Drives the orchestrator against a scripted backend that records every
//! query it receives, so the tests can check how many backend calls a
//! request makes and what each one asked for.
//!
//! Test Categories:
//! 1. Query fan-out and tagging
//! 2. Failure isolation
//! 3. Request validation before any backend call
//! 4. Cursor continuation

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::json;

use genomic_overlap::backend::{
    BackendError, BackendFuture, Hit, RawPage, ScrollId, SearchBackend, SearchRequest,
};
use genomic_overlap::config::EngineConfig;
use genomic_overlap::join::{CursorKind, JoinOrchestrator, OverlapError};
use genomic_overlap::planner::QueryExpr;
use genomic_overlap::response::{CombinedResult, JoinOutcome, OverlapResponse};

// =============================================================================
// Scripted backend
// =============================================================================

/// Answers the driver query with a fixed page and every join query with
/// one hit named after the joined caller and driver coordinates.
#[derive(Debug, Default)]
struct ScriptedBackend {
    driver_rows: Vec<Hit>,
    driver_next: Option<ScrollId>,
    failing_callers: Vec<String>,
    searches: Mutex<Vec<SearchRequest>>,
    scrolls: Mutex<Vec<ScrollId>>,
}

impl ScriptedBackend {
    fn with_rows(count: usize) -> Self {
        Self {
            driver_rows: (0..count).map(driver_row).collect(),
            ..Default::default()
        }
    }

    fn failing(mut self, caller: &str) -> Self {
        self.failing_callers.push(caller.to_string());
        self
    }

    fn searches(&self) -> Vec<SearchRequest> {
        self.searches.lock().unwrap().clone()
    }

    fn join_searches(&self) -> Vec<SearchRequest> {
        self.searches().into_iter().filter(|r| r.sort.is_none()).collect()
    }

    fn answer(&self, request: &SearchRequest) -> Result<RawPage, BackendError> {
        // Only the driver query is sorted
        if request.sort.is_some() {
            return Ok(RawPage {
                total: 100,
                hits: self.driver_rows.clone(),
                next: self.driver_next.clone(),
            });
        }

        let caller = term_value(&request.query, "caller").unwrap_or_default().to_string();
        if self.failing_callers.contains(&caller) {
            return Err(BackendError::Transport(format!("{} shard unavailable", caller)));
        }

        let start = term_value(&request.query, "events.start").unwrap_or_default();
        Ok(RawPage {
            total: 1,
            hits: vec![Hit::new("denormalized_data", format!("{}@{}", caller, start))],
            next: Some(ScrollId::new(format!("sub-{}-{}", caller, start))),
        })
    }
}

impl SearchBackend for ScriptedBackend {
    fn search<'a>(&'a self, request: &'a SearchRequest) -> BackendFuture<'a, RawPage> {
        self.searches.lock().unwrap().push(request.clone());
        let result = self.answer(request);

        // Later callers answer first so completion order differs from caller order
        let caller_rank = term_value(&request.query, "caller")
            .map(|c| c.len() as u64)
            .unwrap_or(0);
        Box::pin(async move {
            tokio::time::sleep(Duration::from_millis(20u64.saturating_sub(caller_rank))).await;
            result
        })
    }

    fn scroll<'a>(&'a self, cursor: &'a ScrollId, _ttl: Duration) -> BackendFuture<'a, RawPage> {
        self.scrolls.lock().unwrap().push(cursor.clone());
        let result = if cursor.as_str() == "expired" {
            Err(BackendError::CursorNotFound(cursor.to_string()))
        } else {
            Ok(RawPage {
                total: 0,
                hits: self.driver_rows.clone(),
                next: None,
            })
        };
        Box::pin(async move { result })
    }
}

/// Value of the first term clause on `field`, depth first
fn term_value<'a>(query: &'a QueryExpr, field: &str) -> Option<&'a str> {
    match query {
        QueryExpr::Term { field: f, value } if f == field => Some(value),
        QueryExpr::Term { .. } | QueryExpr::Range { .. } => None,
        QueryExpr::Nested { query, .. } => term_value(query, field),
        QueryExpr::Bool { must } => must.iter().find_map(|q| term_value(q, field)),
    }
}

fn driver_row(i: usize) -> Hit {
    Hit::new("denormalized_data", format!("v{}", i))
        .with_field("chrom_number", json!(7))
        .with_field("start", json!(100 + i))
        .with_field("end", json!(200 + i))
        .with_field("sample_id", json!("S1"))
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

async fn combined(orchestrator: &JoinOrchestrator, pairs: &[(&str, &str)]) -> CombinedResult {
    match orchestrator.handle(&params(pairs)).await.unwrap() {
        OverlapResponse::Combined(result) => result,
        other => panic!("expected combined result, got {:?}", other),
    }
}

fn orchestrator(backend: &Arc<ScriptedBackend>) -> JoinOrchestrator {
    JoinOrchestrator::new(backend.clone(), EngineConfig::default())
}

// =============================================================================
// Fan-out and tagging
// =============================================================================

/// One driver query plus one join query per (row, secondary caller).
#[tokio::test]
async fn test_new_query_issues_driver_plus_rows_times_callers() {
    let backend = Arc::new(ScriptedBackend::with_rows(4));
    let result = combined(&orchestrator(&backend), &[("callers", "varscan,mutect,strelka,pindel")]).await;

    assert_eq!(backend.searches().len(), 1 + 4 * 3);
    assert_eq!(result.total_driver_hits, 100);
    assert_eq!(result.rows.len(), 4);
}

/// Joins land under their own row and caller regardless of completion order.
#[tokio::test]
async fn test_joins_are_tagged_by_row_and_caller() {
    let backend = Arc::new(ScriptedBackend::with_rows(3));
    let result = combined(&orchestrator(&backend), &[("callers", "varscan,mutect,strelka,pindel")]).await;

    for (row_index, row) in result.rows.iter().enumerate() {
        let indices: Vec<usize> = row.joins.iter().map(|j| j.caller_index).collect();
        assert_eq!(indices, vec![1, 2, 3]);

        for join in &row.joins {
            let expected = format!("{}@{}", join.caller, 100 + row_index);
            assert_eq!(join.rows()[0].id, expected);
            assert_eq!(
                join.cursor().map(ScrollId::as_str),
                Some(format!("sub-{}-{}", join.caller, 100 + row_index).as_str())
            );
        }
    }

    let value = serde_json::to_value(&result).unwrap();
    let first = &value["combined_results"][0];
    assert_eq!(first["dataset-0"]["_id"], "v0");
    assert_eq!(first["dataset-1"]["hits"][0]["_id"], "mutect@100");
    assert_eq!(first["dataset-3"]["hits"][0]["_id"], "pindel@100");
}

/// The join query for mutect carries the driver row's four coordinates and
/// the driver caller on the nested events.
#[tokio::test]
async fn test_join_query_constrains_coordinates() {
    let backend = Arc::new(ScriptedBackend {
        driver_rows: vec![Hit::new("denormalized_data", "v")
            .with_field("chrom_number", json!(7))
            .with_field("start", json!(100))
            .with_field("end", json!(200))
            .with_field("sample_id", json!("S1"))],
        ..Default::default()
    });
    combined(&orchestrator(&backend), &[("callers", "varscan,mutect")]).await;

    let joins = backend.join_searches();
    assert_eq!(joins.len(), 1);

    let query = &joins[0].query;
    assert_eq!(term_value(query, "caller"), Some("mutect"));
    assert_eq!(term_value(query, "events.caller"), Some("varscan"));
    assert_eq!(term_value(query, "events.chrom_number"), Some("7"));
    assert_eq!(term_value(query, "events.start"), Some("100"));
    assert_eq!(term_value(query, "events.end"), Some("200"));
    assert_eq!(term_value(query, "events.sample_id"), Some("S1"));
    assert_eq!(joins[0].size, 20);
}

/// The driver query is sorted, paged and restricted to the driver caller.
#[tokio::test]
async fn test_driver_query_shape() {
    let backend = Arc::new(ScriptedBackend::with_rows(0));
    let result = combined(
        &orchestrator(&backend),
        &[
            ("callers", "varscan,mutect"),
            ("filter-0", "chrom_number:7,start>100"),
            ("sort-dataset-0", "start,asc"),
            ("indices", "calls_a,calls_b"),
            ("output", "start,end,chrom_number,sample_id,score"),
        ],
    )
    .await;
    assert!(result.rows.is_empty());

    let searches = backend.searches();
    assert_eq!(searches.len(), 1);
    let driver = &searches[0];
    assert_eq!(
        driver.query,
        QueryExpr::all(vec![
            QueryExpr::term("caller", "varscan"),
            QueryExpr::term("chrom_number", "7"),
            QueryExpr::gte("start", "100"),
        ])
    );
    assert_eq!(driver.sort.as_ref().map(|s| s.to_dsl()), Some(json!({"start": {"order": "asc"}})));
    assert_eq!(driver.indices, vec!["calls_a", "calls_b"]);
    assert_eq!(driver.fields.last().map(String::as_str), Some("score"));
    assert_eq!(driver.size, 20);
    assert_eq!(driver.scroll_ttl, Duration::from_secs(600));
}

/// Counts join queries in flight and remembers the peak.
#[derive(Debug, Default)]
struct GaugedBackend {
    rows: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    joins: AtomicUsize,
}

impl SearchBackend for GaugedBackend {
    fn search<'a>(&'a self, request: &'a SearchRequest) -> BackendFuture<'a, RawPage> {
        Box::pin(async move {
            if request.sort.is_some() {
                return Ok(RawPage {
                    total: self.rows as u64,
                    hits: (0..self.rows).map(driver_row).collect(),
                    next: None,
                });
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(30)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.joins.fetch_add(1, Ordering::SeqCst);

            Ok(RawPage::default())
        })
    }

    fn scroll<'a>(&'a self, cursor: &'a ScrollId, _ttl: Duration) -> BackendFuture<'a, RawPage> {
        let err = BackendError::CursorNotFound(cursor.to_string());
        Box::pin(async move { Err(err) })
    }
}

/// Joins overlap in time but never exceed the configured bound.
#[tokio::test]
async fn test_join_fan_out_respects_concurrency_bound() {
    let backend = Arc::new(GaugedBackend {
        rows: 3,
        ..Default::default()
    });
    let config = EngineConfig {
        join_concurrency: 2,
        ..EngineConfig::default()
    };
    let orchestrator = JoinOrchestrator::new(backend.clone(), config);

    let result = combined(&orchestrator, &[("callers", "varscan,mutect,strelka")]).await;
    assert_eq!(result.rows.len(), 3);

    let peak = backend.peak.load(Ordering::SeqCst);
    assert_eq!(backend.joins.load(Ordering::SeqCst), 3 * 2);
    assert!(peak > 1, "joins ran sequentially (peak {})", peak);
    assert!(peak <= 2, "concurrency bound exceeded (peak {})", peak);
}

// =============================================================================
// Failure isolation
// =============================================================================

/// A failing caller marks only its own joins; everything else completes.
#[tokio::test]
async fn test_join_failure_is_isolated() {
    let backend = Arc::new(ScriptedBackend::with_rows(2).failing("mutect"));
    let result = combined(&orchestrator(&backend), &[("callers", "varscan,mutect,strelka")]).await;

    assert_eq!(backend.searches().len(), 1 + 2 * 2);
    for row in &result.rows {
        match &row.joins[0].outcome {
            JoinOutcome::Failed { reason } => assert!(reason.contains("shard unavailable")),
            other => panic!("expected failed join, got {:?}", other),
        }
        assert!(!row.joins[1].is_failed());
        assert_eq!(row.joins[1].rows().len(), 1);
    }

    let value = serde_json::to_value(&result).unwrap();
    let marker = &value["combined_results"][1]["dataset-1"];
    assert_eq!(marker["scroll_id"], serde_json::Value::Null);
    assert_eq!(marker["hits"], json!([]));
    assert!(marker["error"].as_str().unwrap().contains("mutect"));
}

/// A driver row without sample_id gets skipped joins and no join queries.
#[tokio::test]
async fn test_row_without_join_key_is_skipped() {
    let mut rows = vec![driver_row(0)];
    rows.push(
        Hit::new("denormalized_data", "partial")
            .with_field("chrom_number", json!(7))
            .with_field("start", json!(1))
            .with_field("end", json!(2)),
    );
    let backend = Arc::new(ScriptedBackend {
        driver_rows: rows,
        ..Default::default()
    });

    let result = combined(&orchestrator(&backend), &[("callers", "varscan,mutect")]).await;

    assert_eq!(backend.join_searches().len(), 1);
    assert!(result.rows[1].joins[0].is_skipped());

    let value = serde_json::to_value(&result).unwrap();
    let skipped = &value["combined_results"][1]["dataset-1"]["skipped"];
    assert!(skipped.as_str().unwrap().contains("sample_id"));
}

// =============================================================================
// Validation before backend calls
// =============================================================================

/// Malformed filters and missing callers are rejected with zero backend calls.
#[tokio::test]
async fn test_rejected_requests_make_no_backend_calls() {
    let backend = Arc::new(ScriptedBackend::with_rows(3));
    let orchestrator = orchestrator(&backend);

    let cases: Vec<(&[(&str, &str)], &str)> = vec![
        (&[("callers", "varscan,mutect"), ("filter-0", "bad_filter_no_op")], "MALFORMED_FILTER"),
        (&[("callers", "varscan,mutect"), ("filter-1", "start>")], "MALFORMED_FILTER"),
        (&[("callers", "varscan"), ("filter-0", "a:1,,b:2")], "MALFORMED_FILTER"),
        (&[("output", "start")], "MISSING_CALLERS"),
        (&[("scrollId", "drv")], "MISSING_CALLERS"),
        (&[("callers", "varscan, ,mutect")], "INVALID_PARAM"),
    ];

    for (pairs, kind) in cases {
        let err = orchestrator.handle(&params(pairs)).await.unwrap_err();
        assert_eq!(err.code(), kind, "params {:?}", pairs);
        assert!(err.is_client_error());
    }

    assert!(backend.searches().is_empty());
    assert!(backend.scrolls.lock().unwrap().is_empty());
}

// =============================================================================
// Cursor continuation
// =============================================================================

/// A driver continuation resumes the cursor and runs fresh joins.
#[tokio::test]
async fn test_resume_driver_runs_fresh_joins() {
    let backend = Arc::new(ScriptedBackend::with_rows(2));
    let result = combined(
        &orchestrator(&backend),
        &[("callers", "varscan,mutect"), ("scrollId", "drv-1"), ("filter-1", "score<40")],
    )
    .await;

    assert_eq!(backend.scrolls.lock().unwrap().as_slice(), &[ScrollId::new("drv-1")]);
    // no driver search, one join per row
    assert_eq!(backend.searches().len(), 2);
    assert_eq!(result.rows.len(), 2);

    for join in backend.join_searches() {
        assert!(format!("{:?}", join.query).contains("events.score"));
    }
}

/// A sub-cursor continuation returns the raw page only.
#[tokio::test]
async fn test_resume_sub_returns_raw_page() {
    let backend = Arc::new(ScriptedBackend::with_rows(2));
    let response = orchestrator(&backend)
        .handle(&params(&[("subScrollId", "sub-mutect-100")]))
        .await
        .unwrap();

    let value = serde_json::to_value(&response).unwrap();
    assert_eq!(value["hits"].as_array().unwrap().len(), 2);
    assert_eq!(value["scroll_id"], serde_json::Value::Null);
    assert!(value.get("combined_results").is_none());
    assert!(backend.searches().is_empty());
}

/// Expired cursors surface as CursorExpired with the stream kind.
#[tokio::test]
async fn test_expired_cursors() {
    let backend = Arc::new(ScriptedBackend::with_rows(1));
    let orchestrator = orchestrator(&backend);

    let err = orchestrator
        .handle(&params(&[("subScrollId", "expired")]))
        .await
        .unwrap_err();
    assert!(matches!(err, OverlapError::CursorExpired { kind: CursorKind::Sub, .. }));

    let err = orchestrator
        .handle(&params(&[("callers", "varscan"), ("scrollId", "expired")]))
        .await
        .unwrap_err();
    assert!(matches!(err, OverlapError::CursorExpired { kind: CursorKind::Driver, .. }));
    assert_eq!(err.status_code().as_u16(), 404);
}
