//! Find Action Contract Tests
//!
//! Behavior of the find action against counting test doubles:
//! - Primary-key requests never reach the dual fetch
//! - Malformed input is rejected before any query runs
//! - Fetch and count run concurrently and both must succeed
//! - Subscription failures never change the response

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use recordfinder::blueprint::{
    BlueprintConfig, FindError, FindOutcome, FindResponse, ModelDef, ModelRegistry, QueryFilter,
    QueryPlan, RecordFinder, RequestContext, SortClause, AttributeType, TOTAL_COUNT_HEADER,
};
use recordfinder::realtime::{RealtimeError, RealtimeResult, SubscriptionHook};
use recordfinder::store::{MemoryStore, RecordStore, StoreError, StoreResult};
use serde_json::{json, Value};
use tokio::sync::Barrier;

// =============================================================================
// Test Doubles
// =============================================================================

/// Store that records every call and answers from canned results
#[derive(Default)]
struct CountingStore {
    records: Vec<Value>,
    total: u64,
    find_error: Option<StoreError>,
    count_error: Option<StoreError>,
    /// When set, find and count both wait here before answering
    rendezvous: Option<Arc<Barrier>>,
    find_calls: AtomicUsize,
    count_calls: AtomicUsize,
    find_one_calls: AtomicUsize,
    last_plan: Mutex<Option<QueryPlan>>,
}

impl CountingStore {
    fn with_records(records: Vec<Value>, total: u64) -> Self {
        Self {
            records,
            total,
            ..Default::default()
        }
    }

    fn calls(&self) -> (usize, usize, usize) {
        (
            self.find_calls.load(Ordering::SeqCst),
            self.count_calls.load(Ordering::SeqCst),
            self.find_one_calls.load(Ordering::SeqCst),
        )
    }

    fn last_plan(&self) -> QueryPlan {
        self.last_plan.lock().unwrap().clone().expect("find was not called")
    }
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn find(&self, _model: &ModelDef, plan: &QueryPlan) -> StoreResult<Vec<Value>> {
        self.find_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_plan.lock().unwrap() = Some(plan.clone());
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        match &self.find_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.records.clone()),
        }
    }

    async fn count(&self, _model: &ModelDef, _filter: &QueryFilter) -> StoreResult<u64> {
        self.count_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(barrier) = &self.rendezvous {
            barrier.wait().await;
        }
        match &self.count_error {
            Some(e) => Err(e.clone()),
            None => Ok(self.total),
        }
    }

    async fn find_one(&self, _model: &ModelDef, key: &Value, _populate: &[String]) -> StoreResult<Option<Value>> {
        self.find_one_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(json!({ "id": key.clone(), "name": "single" })))
    }
}

/// Hook whose every call fails
#[derive(Default)]
struct FailingHook {
    calls: AtomicUsize,
}

impl SubscriptionHook for FailingHook {
    fn subscribe(&self, _connection_id: &str, _model: &ModelDef, _records: &[Value]) -> RealtimeResult<usize> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(RealtimeError::Internal("pubsub offline".to_string()))
    }

    fn watch(&self, _connection_id: &str, _model: &ModelDef) -> RealtimeResult<()> {
        Err(RealtimeError::Internal("pubsub offline".to_string()))
    }

    fn subscribe_deep(&self, _connection_id: &str, _model: &ModelDef, _record: &Value) -> RealtimeResult<usize> {
        Err(RealtimeError::Internal("pubsub offline".to_string()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn models() -> Arc<ModelRegistry> {
    Arc::new(ModelRegistry::from_models([ModelDef::new("user")
        .with_attribute("name", AttributeType::String)
        .with_attribute("age", AttributeType::Number)]))
}

fn finder(store: Arc<CountingStore>) -> RecordFinder {
    RecordFinder::new(models(), store, BlueprintConfig::default())
}

fn users(names: &[&str]) -> Vec<Value> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| json!({ "id": i + 1, "name": name }))
        .collect()
}

fn request(url: &str) -> RequestContext {
    RequestContext::from_url(url, recordfinder::blueprint::Transport::Http).unwrap()
}

fn expect_many(outcome: FindOutcome) -> (Vec<Value>, u64) {
    match outcome {
        FindOutcome::Many(found) => (found.records, found.total_count),
        FindOutcome::One(record) => panic!("expected a record set, got {}", record),
    }
}

// =============================================================================
// Primary-Key Bypass
// =============================================================================

/// A path key goes to the single-record lookup; fetch and count are never called.
#[tokio::test]
async fn test_primary_key_bypasses_dual_fetch() {
    let store = Arc::new(CountingStore::with_records(users(&["A"]), 1));
    let finder = finder(store.clone());

    let outcome = finder.find(&request("/user/7")).await.unwrap();

    assert!(matches!(outcome, FindOutcome::One(ref r) if r["id"] == 7));
    assert_eq!(store.calls(), (0, 0, 1));
}

/// The primary key as a query parameter also bypasses, even next to bad pagination.
#[tokio::test]
async fn test_primary_key_param_bypasses_parser() {
    let store = Arc::new(CountingStore::default());
    let finder = finder(store.clone());

    let outcome = finder.find(&request("/user?id=3&limit=abc")).await.unwrap();

    assert!(matches!(outcome, FindOutcome::One(_)));
    assert_eq!(store.calls(), (0, 0, 1));
}

// =============================================================================
// Rejection Before I/O
// =============================================================================

#[tokio::test]
async fn test_non_numeric_limit_rejected_without_queries() {
    let store = Arc::new(CountingStore::default());
    let finder = finder(store.clone());

    let err = finder.find(&request("/user?limit=abc")).await.unwrap_err();

    assert!(matches!(err, FindError::InvalidQueryParam(_)));
    assert_eq!(store.calls(), (0, 0, 0));
}

#[tokio::test]
async fn test_malformed_input_rejected_without_queries() {
    let store = Arc::new(CountingStore::default());
    let finder = finder(store.clone());

    for url in [
        "/user?limit=-1",
        "/user?limit=5000",
        "/user?skip=x",
        "/user?where=%7Bnot-json",
        "/user?sort=ghost%20ASC",
        "/user?sort=name%20SIDEWAYS",
        "/user?where=%7B%22name%22%3A%7B%22like%22%3A3%7D%7D",
    ] {
        let err = finder.find(&request(url)).await.unwrap_err();
        assert_eq!(err.status_code().as_u16(), 400, "{} should be rejected", url);
    }

    assert_eq!(store.calls(), (0, 0, 0));
}

#[tokio::test]
async fn test_unknown_model_is_404() {
    let store = Arc::new(CountingStore::default());
    let err = finder(store.clone()).find(&request("/ghost")).await.unwrap_err();

    assert!(matches!(err, FindError::UnknownModel(ref m) if m == "ghost"));
    assert_eq!(err.status_code().as_u16(), 404);
    assert_eq!(store.calls(), (0, 0, 0));
}

// =============================================================================
// Dual Fetch
// =============================================================================

/// Fetch and count must be in flight together: each waits for the other.
#[tokio::test]
async fn test_fetch_and_count_run_concurrently() {
    let store = Arc::new(CountingStore {
        records: users(&["A", "B"]),
        total: 2,
        rendezvous: Some(Arc::new(Barrier::new(2))),
        ..Default::default()
    });
    let finder = finder(store.clone());

    let outcome = tokio::time::timeout(Duration::from_secs(5), finder.find(&request("/user")))
        .await
        .expect("fetch and count were serialized")
        .unwrap();

    let (records, total) = expect_many(outcome);
    assert_eq!(records.len(), 2);
    assert_eq!(total, 2);
    assert_eq!(store.calls(), (1, 1, 0));
}

#[tokio::test]
async fn test_fetch_failure_is_storage_error_without_count_header() {
    let store = Arc::new(CountingStore {
        total: 4,
        find_error: Some(StoreError::Unavailable("disk gone".to_string())),
        ..Default::default()
    });
    let finder = finder(store.clone());

    let result = finder.find(&request("/user")).await;
    assert!(matches!(result, Err(FindError::Storage(_))));

    let response = FindResponse::from(result);
    assert_eq!(response.status_code, 500);
    assert!(!response.headers.contains_key(TOTAL_COUNT_HEADER));

    // Both branches ran to completion
    assert_eq!(store.calls(), (1, 1, 0));
}

#[tokio::test]
async fn test_count_failure_fails_request() {
    let store = Arc::new(CountingStore {
        records: users(&["A"]),
        count_error: Some(StoreError::Query("count timed out".to_string())),
        ..Default::default()
    });

    let err = finder(store).find(&request("/user")).await.unwrap_err();
    assert_eq!(err.status_code().as_u16(), 500);
    assert!(err.to_string().contains("count timed out"));
}

#[tokio::test]
async fn test_fetch_error_wins_when_both_fail() {
    let store = Arc::new(CountingStore {
        find_error: Some(StoreError::Query("fetch broke".to_string())),
        count_error: Some(StoreError::Query("count broke".to_string())),
        ..Default::default()
    });

    let err = finder(store).find(&request("/user")).await.unwrap_err();
    assert!(err.to_string().contains("fetch broke"));
}

#[tokio::test]
async fn test_count_ignores_pagination_but_fetch_gets_plan() {
    let store = Arc::new(CountingStore::with_records(users(&["A", "B"]), 9));
    let finder = finder(store.clone());

    let (records, total) = expect_many(
        finder
            .find(&request("/user?name=A&limit=2&skip=4&sort=age%20DESC"))
            .await
            .unwrap(),
    );

    assert_eq!(records.len(), 2);
    assert_eq!(total, 9);

    let plan = store.last_plan();
    assert_eq!(plan.limit, 2);
    assert_eq!(plan.offset, 4);
    assert_eq!(plan.sort, vec![SortClause::desc("age")]);
    assert_eq!(plan.filter.len(), 1);
}

// =============================================================================
// Result Composer
// =============================================================================

#[tokio::test]
async fn test_empty_result_is_200_with_zero_count() {
    let store = Arc::new(CountingStore::with_records(Vec::new(), 0));

    let response = FindResponse::from(finder(store).find(&request("/user?name=nobody")).await);

    assert_eq!(response.status_code, 200);
    assert_eq!(response.body, json!([]));
    assert_eq!(response.headers[TOTAL_COUNT_HEADER], "0");
}

#[tokio::test]
async fn test_subscription_failure_does_not_change_response() {
    let store = Arc::new(CountingStore::with_records(users(&["A", "B"]), 2));
    let hook = Arc::new(FailingHook::default());
    let finder = finder(store).with_subscriptions(hook.clone());

    let ctx = request("/user").over_socket("conn-9");
    let response = FindResponse::from(finder.find(&ctx).await);

    assert_eq!(response.status_code, 200);
    assert_eq!(response.total_count(), Some(2));
    assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
    assert_eq!(finder.metrics().snapshot().subscription_failures, 1);
}

#[tokio::test]
async fn test_http_requests_never_touch_subscriptions() {
    let store = Arc::new(CountingStore::with_records(users(&["A"]), 1));
    let hook = Arc::new(FailingHook::default());
    let finder = finder(store).with_subscriptions(hook.clone());

    finder.find(&request("/user")).await.unwrap();
    assert_eq!(hook.calls.load(Ordering::SeqCst), 0);
}

// =============================================================================
// Against the In-Memory Store
// =============================================================================

fn memory_finder() -> RecordFinder {
    let models = models();
    let store = Arc::new(MemoryStore::new(models.clone()));
    for (id, name, age) in [(1, "A", 30), (2, "B", 25), (3, "C", 41), (4, "D", 19), (5, "E", 33)] {
        store
            .insert("user", json!({ "id": id, "name": name, "age": age }))
            .unwrap();
    }
    RecordFinder::new(models, store, BlueprintConfig::default())
}

#[tokio::test]
async fn test_limit_and_skip_select_window() {
    let (records, total) = expect_many(memory_finder().find(&request("/user?limit=2&skip=1")).await.unwrap());

    let names: Vec<&str> = records.iter().map(|r| r["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["B", "C"]);
    assert_eq!(total, 5);
}

#[tokio::test]
async fn test_sort_desc_orders_records() {
    let (records, _) = expect_many(memory_finder().find(&request("/user?sort=age%20DESC")).await.unwrap());

    let ages: Vec<i64> = records.iter().map(|r| r["age"].as_i64().unwrap()).collect();
    assert_eq!(ages, vec![41, 33, 30, 25, 19]);
}

#[tokio::test]
async fn test_where_modifiers_and_count_agree() {
    let url = "/user?where=%7B%22age%22%3A%7B%22%3E%3D%22%3A30%7D%7D&limit=1";
    let (records, total) = expect_many(memory_finder().find(&request(url)).await.unwrap());

    assert_eq!(records.len(), 1);
    assert_eq!(total, 3);
    assert!(records.len() as u64 <= total);
}

// =============================================================================
// Undeclared Fields and Adversarial Filters
// =============================================================================

fn encode(raw: &str) -> String {
    raw.bytes()
        .map(|b| match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' | b'.' => (b as char).to_string(),
            other => format!("%{:02X}", other),
        })
        .collect()
}

fn tagged_finder() -> RecordFinder {
    let models = models();
    let store = Arc::new(MemoryStore::new(models.clone()));
    for record in [
        json!({ "id": 1, "name": "A", "nick": "zed", "badge": 7 }),
        json!({ "id": 2, "name": "B", "nick": "amy", "badge": "7" }),
        json!({ "id": 3, "name": "C", "badge": 12 }),
        json!({ "id": 4, "name": "D", "badge": "gold" }),
    ] {
        store.insert("user", record).unwrap();
    }
    RecordFinder::new(models, store, BlueprintConfig::default())
}

#[tokio::test]
async fn test_undeclared_field_filters_by_equality() {
    let finder = tagged_finder();

    let (records, total) = expect_many(finder.find(&request("/user?nick=zed")).await.unwrap());
    assert_eq!(total, 1);
    assert_eq!(records[0]["name"], "A");

    let (records, total) = expect_many(finder.find(&request("/user?nick=nobody")).await.unwrap());
    assert!(records.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_mixed_kind_field_filters_by_kind() {
    let finder = tagged_finder();

    let (records, _) = expect_many(finder.find(&request("/user?badge=7")).await.unwrap());
    let ids: Vec<i64> = records.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1]);

    let url = format!("/user?where={}", encode(r#"{"badge":{">":5}}"#));
    let (records, total) = expect_many(finder.find(&request(&url)).await.unwrap());
    let ids: Vec<i64> = records.iter().map(|r| r["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 3]);
    assert_eq!(total, 2);

    let url = format!("/user?where={}", encode(r#"{"badge":{"startsWith":"go"}}"#));
    let (records, _) = expect_many(finder.find(&request(&url)).await.unwrap());
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["id"], 4);
}

#[tokio::test]
async fn test_backtracking_like_pattern_answers_promptly() {
    let models = models();
    let store = Arc::new(MemoryStore::new(models.clone()));
    store.insert("user", json!({ "id": 1, "name": "a".repeat(40) })).unwrap();
    let finder = RecordFinder::new(models, store, BlueprintConfig::default());

    let where_clause = format!(r#"{{"name":{{"like":"{}b"}}}}"#, "%a".repeat(9));
    let url = format!("/user?where={}", encode(&where_clause));

    let started = std::time::Instant::now();
    let (records, total) = expect_many(finder.find(&request(&url)).await.unwrap());
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(records.is_empty());
    assert_eq!(total, 0);
}

#[tokio::test]
async fn test_oversized_like_pattern_rejected_without_queries() {
    let store = Arc::new(CountingStore::default());
    let finder = finder(store.clone());

    let where_clause = format!(r#"{{"name":{{"like":"{}"}}}}"#, "_".repeat(200_000));
    let ctx = RequestContext::http("user", Default::default()).with_param("where", where_clause);

    let err = finder.find(&ctx).await.unwrap_err();
    assert!(matches!(err, FindError::InvalidFilter(_)));
    assert_eq!(store.calls(), (0, 0, 0));
}
