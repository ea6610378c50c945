//! Inventory Order Tracker
//!
//! Stock reservation, a linear order fulfillment lifecycle and an auditable
//! status history, served over a JSON HTTP API.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod health;
pub mod middleware_helpers;
pub mod migrator;
pub mod openapi;
pub mod queries;
pub mod services;
pub mod tracing;

use axum::{
    http::{header, HeaderValue, Method},
    middleware, Router,
};
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{AllowOrigin, Any, CorsLayer},
    timeout::TimeoutLayer,
};

use crate::{
    db::{DatabaseAccess, DbPool},
    services::AppServices,
};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DbPool>,
    pub config: config::AppConfig,
    pub services: AppServices,
}

impl AppState {
    pub fn new(db: Arc<DbPool>, config: config::AppConfig) -> Self {
        let services = AppServices::new(db.clone());
        Self {
            db,
            config,
            services,
        }
    }

    /// Read-side access used by the query objects.
    pub fn db_access(&self) -> DatabaseAccess {
        DatabaseAccess::new(self.db.clone())
    }
}

/// JSON API routes, mounted under `/api`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/orders", handlers::order_routes())
        .nest("/products", handlers::product_routes())
}

fn cors_layer(config: &config::AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                ::tracing::warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::LOCATION]);

    if origins.is_empty() {
        // no configured origins: browsers on other hosts are refused
        layer.allow_origin(AllowOrigin::list(Vec::<HeaderValue>::new()))
    } else if config.is_development() && origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(AllowOrigin::list(origins))
    }
}

/// Assembles the full application router: API, health probes, Swagger UI in
/// development, and the HTTP middleware stack.
pub fn build_router(state: AppState) -> Router {
    let mut router = Router::new()
        .nest("/api", api_routes())
        .with_state(state.clone())
        .nest("/health", health::health_routes(state.db.clone()));

    if state.config.is_development() {
        router = router.merge(openapi::swagger_ui());
    }

    router
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(state.config.request_timeout()))
        .layer(cors_layer(&state.config))
        .layer(crate::tracing::configure_http_tracing())
        .layer(middleware::from_fn(
            middleware_helpers::request_id_middleware,
        ))
}
