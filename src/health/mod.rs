/*!
 * # Health Check Module
 *
 * Endpoints for monitoring the service:
 *
 * - Basic health check (`/health`) - the process is up and serving requests
 * - Readiness check (`/health/ready`) - the database answers a ping
 * - Version (`/health/version`) - build information
 */

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, warn};

use crate::db::{check_connection, DbPool};

/// Basic health status
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub status: HealthStatus,
    pub database: HealthStatus,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    pub db_pool: Arc<DbPool>,
    pub start_time: SystemTime,
}

impl HealthState {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            start_time: SystemTime::now(),
        }
    }

    /// Calculate system uptime
    pub fn uptime(&self) -> u64 {
        SystemTime::now()
            .duration_since(self.start_time)
            .unwrap_or(Duration::from_secs(0))
            .as_secs()
    }

    pub async fn readiness(&self) -> ReadinessReport {
        let database = match check_connection(&self.db_pool).await {
            Ok(()) => HealthStatus::Healthy,
            Err(e) => {
                warn!(error = %e, "Readiness probe: database unreachable");
                HealthStatus::Unhealthy
            }
        };

        ReadinessReport {
            status: database,
            database,
            uptime_seconds: self.uptime(),
            timestamp: Utc::now(),
        }
    }
}

/// Liveness probe. Answers without touching the database.
pub async fn health_check() -> impl IntoResponse {
    debug!("Health check endpoint called");
    (StatusCode::OK, Json(json!({ "status": "healthy" })))
}

/// Readiness probe; 503 while the database is unreachable.
pub async fn readiness_check(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    let report = state.readiness().await;
    let status_code = match report.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(report))
}

/// Returns build and version information
pub async fn version_info() -> impl IntoResponse {
    Json(json!({
        "service": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

/// Creates router with health check endpoints, to be nested under `/health`.
pub fn health_routes(db_pool: Arc<DbPool>) -> Router {
    let health_state = Arc::new(HealthState::new(db_pool));

    Router::new()
        .route("/", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/version", get(version_info))
        .with_state(health_state)
}
