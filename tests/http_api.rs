//! HTTP API tests against the in-memory store

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use ledgerbank::api::{self, AppState, error_codes};
use ledgerbank::auth::{JwtMaker, TokenMaker};
use ledgerbank::random::RandomGen;
use ledgerbank::store::{Account, CreateAccountParams, MemoryStore, Queries, Store};

struct TestApp {
    app: Router,
    store: MemoryStore,
    maker: Arc<dyn TokenMaker>,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryStore::new();
        let maker: Arc<dyn TokenMaker> =
            Arc::new(JwtMaker::new(&RandomGen::seeded(99).string(32)).unwrap());
        let state = Arc::new(AppState::new(
            store.clone(),
            maker.clone(),
            Duration::from_secs(5),
        ));
        Self {
            app: api::router(state),
            store,
            maker,
        }
    }

    async fn account(&self, owner: &str, balance: i64, currency: &str) -> Account {
        self.store
            .queries()
            .await
            .unwrap()
            .create_account(CreateAccountParams {
                owner: owner.to_string(),
                balance,
                currency: currency.to_string(),
            })
            .await
            .unwrap()
    }

    fn token(&self, username: &str) -> String {
        self.maker
            .create_token(username, chrono::Duration::minutes(5))
            .unwrap()
            .0
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn transfer(&self, token: &str, from: i64, to: i64, amount: i64, currency: &str) -> (StatusCode, Value) {
        self.send(
            Method::POST,
            "/api/v1/transfers",
            Some(token),
            Some(json!({
                "from_account_id": from,
                "to_account_id": to,
                "amount": amount,
                "currency": currency,
            })),
        )
        .await
    }
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], error_codes::SUCCESS);
    assert!(body["data"]["timestamp_ms"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn test_private_routes_require_token() {
    let app = TestApp::new();
    let alice = app.account("alice", 100, "USD").await;

    let uri = format!("/api/v1/accounts/{}", alice.id);
    let (status, body) = app.send(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], error_codes::MISSING_AUTH);

    let (status, _) = app.transfer("not-a-token", alice.id, alice.id, 1, "USD").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_transfer_success() {
    let app = TestApp::new();
    let alice = app.account("alice", 500, "USD").await;
    let bob = app.account("bob", 200, "USD").await;

    let (status, body) = app
        .transfer(&app.token("alice"), alice.id, bob.id, 100, "USD")
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["code"], 0);

    let data = &body["data"];
    assert_eq!(data["transfer"]["amount"], 100);
    assert_eq!(data["from_account"]["balance"], 400);
    assert_eq!(data["to_account"]["balance"], 300);
    assert_eq!(data["from_entry"]["amount"], -100);
    assert_eq!(data["to_entry"]["amount"], 100);
}

#[tokio::test]
async fn test_transfer_rejects_non_owner() {
    let app = TestApp::new();
    let alice = app.account("alice", 500, "USD").await;
    let bob = app.account("bob", 200, "USD").await;

    let (status, body) = app
        .transfer(&app.token("bob"), alice.id, bob.id, 100, "USD")
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], error_codes::NOT_OWNER);
    assert_eq!(app.store.row_counts(), (2, 0, 0));
}

#[tokio::test]
async fn test_transfer_request_validation() {
    let app = TestApp::new();
    let alice = app.account("alice", 500, "USD").await;
    let carol = app.account("carol", 500, "EUR").await;
    let token = app.token("alice");

    // Currency differs from the destination account
    let (status, body) = app.transfer(&token, alice.id, carol.id, 10, "USD").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], error_codes::CURRENCY_MISMATCH);

    // Unsupported currency
    let (status, _) = app.transfer(&token, alice.id, carol.id, 10, "GBP").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Non-positive amount
    for amount in [0, -5] {
        let (status, body) = app.transfer(&token, alice.id, carol.id, amount, "USD").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], error_codes::INVALID_PARAMETER);
    }

    // Unknown destination
    let (status, body) = app.transfer(&token, alice.id, 9_999, 10, "USD").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], error_codes::NOT_FOUND);

    assert_eq!(app.store.row_counts(), (2, 0, 0));
}

#[tokio::test]
async fn test_get_account() {
    let app = TestApp::new();
    let alice = app.account("alice", 500, "USD").await;

    let uri = format!("/api/v1/accounts/{}", alice.id);
    let (status, body) = app
        .send(Method::GET, &uri, Some(&app.token("alice")), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["owner"], "alice");
    assert_eq!(body["data"]["balance"], 500);
    assert_eq!(body["data"]["currency"], "USD");

    let (status, _) = app
        .send(Method::GET, &uri, Some(&app.token("mallory")), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .send(
            Method::GET,
            "/api/v1/accounts/424242",
            Some(&app.token("alice")),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_entries_and_transfers() {
    let app = TestApp::new();
    let alice = app.account("alice", 500, "USD").await;
    let bob = app.account("bob", 200, "USD").await;
    let alice_token = app.token("alice");

    for _ in 0..3 {
        let (status, _) = app.transfer(&alice_token, alice.id, bob.id, 10, "USD").await;
        assert_eq!(status, StatusCode::OK);
    }

    let uri = format!("/api/v1/accounts/{}/entries?limit=2&offset=1", alice.id);
    let (status, body) = app.send(Method::GET, &uri, Some(&alice_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let entries = body["data"].as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e["amount"] == -10));

    // Bob sees the transfers from the destination side
    let uri = format!("/api/v1/accounts/{}/transfers", bob.id);
    let (status, body) = app
        .send(Method::GET, &uri, Some(&app.token("bob")), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);

    for query in ["limit=0", "limit=101", "offset=-1"] {
        let uri = format!("/api/v1/accounts/{}/entries?{}", alice.id, query);
        let (status, body) = app.send(Method::GET, &uri, Some(&alice_token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", query);
        assert_eq!(body["code"], error_codes::INVALID_PARAMETER);
    }
}
