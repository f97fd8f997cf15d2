//! HTTP surface: payment callback, admin cleanup, health probes.

pub mod admin;
pub mod payments;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{error, info};

use crate::health::{HealthChecker, HealthState, HealthStatus};
use crate::services::cleanup::CleanupSweeper;
use crate::services::reconciler::CallbackReconciler;

/// Shared application state for all routes.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<CallbackReconciler>,
    pub sweeper: Arc<CleanupSweeper>,
    pub health_checker: HealthChecker,
    pub site_url: String,
    /// Default sweep threshold when the admin request omits one.
    pub cleanup_threshold_minutes: i64,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/health/live", get(liveness))
        .route("/payments/callback", get(payments::payment_callback))
        .route("/admin/cleanup", post(admin::run_cleanup))
        .route("/admin/cleanup/preview", get(admin::preview_cleanup))
        .with_state(state)
}

async fn root() -> &'static str {
    "Welcome to Oylkka Backend API"
}

async fn health(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, String)> {
    let health_status = state.health_checker.check_health().await;

    if matches!(health_status.status, HealthState::Unhealthy) {
        error!("Health check failed - service unhealthy");
        Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable".to_string(),
        ))
    } else {
        info!("Health check passed");
        Ok(Json(health_status))
    }
}

/// Liveness probe: only checks that the process is serving requests.
async fn liveness() -> &'static str {
    "OK"
}
