#![allow(dead_code)]

use std::{path::PathBuf, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, StatusCode},
    response::Response,
    Router,
};
use inventory_order_tracker::{
    build_router,
    config::AppConfig,
    db::{self, DbConfig},
    AppState,
};
use serde_json::Value;
use tower::ServiceExt;

/// Seeded catalogue ids used across the integration tests.
pub const AMOXICILLIN: i32 = 1;
pub const LISINOPRIL: i32 = 2;
pub const OMEPRAZOLE: i32 = 4;
pub const AZITHROMYCIN: i32 = 8;

/// Helper harness for spinning up the full router backed by a freshly
/// migrated and seeded SQLite database.
#[derive(Clone)]
pub struct TestApp {
    router: Router,
    pub state: AppState,
    _db_file: Option<Arc<DbFile>>,
}

/// Status plus decoded JSON body (`Value::Null` for empty bodies).
pub struct TestResponse {
    pub status: StatusCode,
    pub location: Option<String>,
    pub request_id: Option<String>,
    pub body: Value,
}

/// On-disk database removed once the last harness clone is dropped.
struct DbFile(PathBuf);

impl Drop for DbFile {
    fn drop(&mut self) {
        for suffix in ["", "-journal", "-wal", "-shm"] {
            let mut path = self.0.clone().into_os_string();
            path.push(suffix);
            let _ = std::fs::remove_file(path);
        }
    }
}

impl TestApp {
    /// Single-connection in-memory database; requests run one at a time.
    pub async fn new() -> Self {
        let pool = db::establish_connection_with_config(&DbConfig {
            url: "sqlite::memory:".to_string(),
            // one connection keeps every request on the same in-memory database
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        })
        .await
        .expect("failed to create test database");

        Self::with_pool(pool, None).await
    }

    /// File-backed database behind a pool of several connections, so
    /// concurrent requests run in concurrent transactions.
    pub async fn with_connection_pool() -> Self {
        let path = std::env::temp_dir().join(format!(
            "inventory-order-tracker-{}.db",
            uuid::Uuid::new_v4()
        ));
        let pool = db::establish_connection_with_config(&DbConfig {
            url: format!("sqlite://{}?mode=rwc", path.display()),
            max_connections: 8,
            min_connections: 2,
            ..Default::default()
        })
        .await
        .expect("failed to create file-backed test database");

        Self::with_pool(pool, Some(Arc::new(DbFile(path)))).await
    }

    async fn with_pool(pool: db::DbPool, db_file: Option<Arc<DbFile>>) -> Self {
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let mut cfg = AppConfig::new(
            "sqlite::memory:".to_string(),
            "127.0.0.1".to_string(),
            18_080,
            "test".to_string(),
        );
        cfg.auto_migrate = false;

        let state = AppState::new(Arc::new(pool), cfg);
        let router = build_router(state.clone());

        Self {
            router,
            state,
            _db_file: db_file,
        }
    }

    /// Send a request against the router and decode the JSON response.
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = if let Some(json) = body {
            builder = builder.header("content-type", "application/json");
            Body::from(serde_json::to_vec(&json).expect("failed to serialize json request body"))
        } else {
            Body::empty()
        };
        let request = builder.body(body).expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");
        decode(response).await
    }

    /// Send a raw body with the given headers.
    pub async fn request_raw(
        &self,
        method: Method,
        uri: &str,
        body: &'static str,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        let request = builder
            .body(Body::from(body))
            .expect("failed to build request");
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router error during test request");
        decode(response).await
    }

    pub async fn get(&self, uri: &str) -> TestResponse {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> TestResponse {
        self.request(Method::POST, uri, Some(body)).await
    }

    pub async fn put(&self, uri: &str, body: Option<Value>) -> TestResponse {
        self.request(Method::PUT, uri, body).await
    }

    pub async fn delete(&self, uri: &str) -> TestResponse {
        self.request(Method::DELETE, uri, None).await
    }

    /// Places an order and returns the response.
    pub async fn place_order(&self, customer: &str, lines: &[(i32, i32)]) -> TestResponse {
        let items: Vec<Value> = lines
            .iter()
            .map(|(product_id, quantity)| {
                serde_json::json!({ "productId": product_id, "quantity": quantity })
            })
            .collect();
        self.post(
            "/api/orders",
            serde_json::json!({ "customerName": customer, "items": items }),
        )
        .await
    }

    pub async fn advance(&self, order_id: i64) -> TestResponse {
        self.put(&format!("/api/orders/{}/status", order_id), None)
            .await
    }

    /// Current on-hand quantity of a product.
    pub async fn stock_of(&self, product_id: i32) -> i64 {
        let response = self.get(&format!("/api/products/{}", product_id)).await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["quantityOnHand"]
            .as_i64()
            .expect("quantityOnHand should be a number")
    }
}

async fn decode(response: Response) -> TestResponse {
    let status = response.status();
    let (location, request_id) = {
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        (header("location"), header("x-request-id"))
    };

    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("failed to read response body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("response body should be JSON")
    };

    TestResponse {
        status,
        location,
        request_id,
        body,
    }
}
