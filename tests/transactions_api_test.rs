use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use btc_ledger::adapters::InMemoryTransactionRepository;
use btc_ledger::domain::Transaction;
use btc_ledger::ports::{with_deadline, RepositoryError, RepositoryResult, TransactionRepository};
use btc_ledger::{create_app, AppState};
use serde_json::{json, Value};
use tower::ServiceExt;

fn test_app() -> Router {
    let repo = Arc::new(InMemoryTransactionRepository::new());
    create_app(AppState::new(repo, "test"))
}

async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            builder = builder.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(builder.body(body).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let bytes = hyper::body::to_bytes(response.into_body()).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

fn first_purchase() -> Value {
    json!({
        "amount_btc": 1.0,
        "price_per_btc": 60000,
        "transaction_type": 1,
        "note": "first purchase"
    })
}

#[tokio::test]
async fn test_create_then_show() {
    let app = test_app();

    let (status, body) = send(&app, Method::POST, "/transactions", Some(first_purchase())).await;
    assert_eq!(status, StatusCode::CREATED);
    let created = &body["transaction"];
    assert_eq!(created["id"], 1);
    assert_eq!(created["version"], 1);
    assert_eq!(created["note"], "first purchase");
    assert!(created["created_at"].is_string());

    let (status, body) = send(&app, Method::GET, "/transactions/1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transaction"], *created);
}

#[tokio::test]
async fn test_create_sets_location_header() {
    let app = test_app();
    let request = Request::builder()
        .method(Method::POST)
        .uri("/transactions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(first_purchase().to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()[header::LOCATION], "/transactions/1");
}

#[tokio::test]
async fn test_list_is_ordered_by_id() {
    let app = test_app();

    let (status, body) = send(&app, Method::GET, "/transactions", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transactions"], json!([]));

    for price in [61000, 59000, 60500] {
        let payload = json!({"amount_btc": 0.1, "price_per_btc": price, "transaction_type": 1});
        send(&app, Method::POST, "/transactions", Some(payload)).await;
    }

    let (_, body) = send(&app, Method::GET, "/transactions", None).await;
    let ids: Vec<i64> = body["transactions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(ids, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_edit_conflict_scenario() {
    let app = test_app();
    send(&app, Method::POST, "/transactions", Some(first_purchase())).await;

    let (status, body) = send(
        &app,
        Method::PUT,
        "/transactions/1",
        Some(json!({"note": "edited", "version": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["transaction"]["version"], 2);
    assert_eq!(body["transaction"]["note"], "edited");
    assert_eq!(body["transaction"]["price_per_btc"], 60000);

    let (status, body) = send(
        &app,
        Method::PUT,
        "/transactions/1",
        Some(json!({"note": "stale", "version": 1})),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], 409);

    let (status, _) = send(&app, Method::DELETE, "/transactions/1", None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, Method::GET, "/transactions/1", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_without_version_uses_the_one_just_read() {
    let app = test_app();
    send(&app, Method::POST, "/transactions", Some(first_purchase())).await;

    for expected in [2, 3] {
        let (status, body) = send(
            &app,
            Method::PUT,
            "/transactions/1",
            Some(json!({"amount_btc": 0.5})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["transaction"]["version"], expected);
    }
}

#[tokio::test]
async fn test_missing_record_is_not_found() {
    let app = test_app();

    let (status, _) = send(&app, Method::GET, "/transactions/999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::PUT,
        "/transactions/999999",
        Some(json!({"note": "nope"})),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, Method::DELETE, "/transactions/999999", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_ids_are_not_found() {
    let app = test_app();

    for uri in ["/transactions/abc", "/transactions/0", "/transactions/-5"] {
        let (status, _) = send(&app, Method::GET, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/transactions")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"amount_btc\": "))
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        Method::POST,
        "/transactions",
        Some(json!({"amount_btc": 1.0, "price_per_btc": 1, "transaction_type": 1, "id": 7})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_health_reports_connected_store() {
    let app = test_app();
    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "test");
}

/// Store whose every call outlives its deadline.
struct StalledRepository;

impl StalledRepository {
    async fn stall<T>(&self) -> RepositoryResult<T> {
        with_deadline(Duration::from_millis(20), async {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err::<T, _>(RepositoryError::NotFound)
        })
        .await
    }
}

#[async_trait]
impl TransactionRepository for StalledRepository {
    async fn insert(&self, _tx: &mut Transaction) -> RepositoryResult<()> {
        self.stall().await
    }

    async fn get(&self, _id: i64) -> RepositoryResult<Transaction> {
        self.stall().await
    }

    async fn get_all(&self) -> RepositoryResult<Vec<Transaction>> {
        self.stall().await
    }

    async fn update(&self, _tx: &mut Transaction) -> RepositoryResult<i32> {
        self.stall().await
    }

    async fn delete(&self, _id: i64) -> RepositoryResult<()> {
        self.stall().await
    }

    async fn ping(&self) -> RepositoryResult<()> {
        self.stall().await
    }
}

#[tokio::test]
async fn test_stalled_store_surfaces_as_server_error() {
    let app = create_app(AppState::new(Arc::new(StalledRepository), "test"));

    let (status, body) = send(&app, Method::GET, "/transactions/1", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["status"], 500);

    let (status, _) = send(&app, Method::GET, "/transactions", None).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, body) = send(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["db"], "disconnected");
}

async fn send_raw(app: &Router, method: Method, uri: &str, raw: &'static str) -> StatusCode {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(raw))
        .unwrap();
    app.clone().oneshot(request).await.unwrap().status()
}

#[tokio::test]
async fn test_malformed_update_body_is_rejected_before_the_store() {
    let stalled = create_app(AppState::new(Arc::new(StalledRepository), "test"));
    let status = send_raw(&stalled, Method::PUT, "/transactions/1", "{\"note\": ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let app = test_app();
    let status = send_raw(&app, Method::PUT, "/transactions/999999", "{\"note\": ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let status = send_raw(&app, Method::PUT, "/transactions/999999", "{\"id\": 3}").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
