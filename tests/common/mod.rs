//! Common test utilities

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::Value;
use tower::util::ServiceExt;

use banking_admin::api::middleware::cors_layer;
use banking_admin::store::MemoryStore;
use banking_admin::{build_router, db, AppState};

pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Router over a fresh in-memory store, plus a bearer token for `admin`
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub token: String,
}

/// Build the app with the default users seeded and log in as `admin`
pub async fn spawn_app() -> TestApp {
    spawn_app_with_origins(&["*".to_string()]).await
}

/// Same as `spawn_app`, with CORS restricted to `origins`
pub async fn spawn_app_with_origins(origins: &[String]) -> TestApp {
    let state = AppState::new(Arc::new(MemoryStore::new()), TEST_JWT_SECRET, 1);
    db::seed_users(&state.auth).await.expect("Failed to seed users");

    let router = build_router(state.clone(), cors_layer(origins));

    let (status, body) = send(
        &router,
        "POST",
        "/api/auth/login",
        None,
        Some(serde_json::json!({ "username": "admin", "password": "password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "Login failed: {}", body);

    let token = body["token"].as_str().expect("token in login response").to_string();

    TestApp {
        router,
        state,
        token,
    }
}

impl TestApp {
    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.router, "GET", uri, Some(&self.token), None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.router, "POST", uri, Some(&self.token), Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        send(&self.router, "PUT", uri, Some(&self.token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        send(&self.router, "DELETE", uri, Some(&self.token), None).await
    }

    /// Create a customer and return its id
    pub async fn create_customer(&self, name: &str, email: &str) -> i64 {
        let (status, body) = self
            .post(
                "/api/customers",
                serde_json::json!({
                    "name": name,
                    "email": email,
                    "mobileNumber": "+1-555-0100",
                    "address": "10 Main Street, Springfield, IL 62701"
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "Customer creation failed: {}", body);
        body["customerId"].as_i64().expect("customerId in response")
    }

    /// Open an account and return its number
    pub async fn create_account(&self, customer_id: i64, balance: &str, account_type: &str) -> String {
        let (status, body) = self
            .post(
                "/api/accounts",
                serde_json::json!({
                    "accountHolderName": "Ann Lee",
                    "accountBalance": balance,
                    "accountType": account_type,
                    "customerId": customer_id
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "Account creation failed: {}", body);
        body["accountNo"].as_str().expect("accountNo in response").to_string()
    }
}

/// Send one request and decode the body as JSON. Empty bodies decode to
/// `Null`, non-JSON bodies to a string.
pub async fn send(
    router: &Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .unwrap();

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };

    (status, value)
}
