use axum::{
    extract::{Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::api::AppState;
use crate::error::{AppError, AppErrorKind, ValidationError};
use crate::middleware::error::get_request_id_from_headers;
use crate::services::cleanup::{CleanupOptions, CleanupReport};

/// One year in minutes. Sweeps older than this are a caller mistake, and
/// thresholds anywhere near `i64::MAX` overflow the cutoff arithmetic.
pub const MAX_MINUTES_THRESHOLD: i64 = 60 * 24 * 365;

#[derive(Debug, Deserialize)]
pub struct CleanupRequest {
    pub minutes_threshold: Option<i64>,
    pub user_id: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    pub include_image_cleanup: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CleanupPreviewQuery {
    pub minutes_threshold: Option<i64>,
    pub user_id: Option<String>,
}

fn validate_minutes_threshold(
    minutes_threshold: i64,
    request_id: Option<String>,
) -> Result<(), AppError> {
    if (0..=MAX_MINUTES_THRESHOLD).contains(&minutes_threshold) {
        return Ok(());
    }
    let err = AppError::new(AppErrorKind::Validation(ValidationError::InvalidField {
        field: "minutes_threshold".to_string(),
        reason: format!("must be between 0 and {}", MAX_MINUTES_THRESHOLD),
    }));
    Err(match request_id {
        Some(req_id) => err.with_request_id(req_id),
        None => err,
    })
}

/// POST /admin/cleanup
///
/// Runs one sweep of abandoned reservations. The sweep itself never fails
/// the request; only invalid parameters are rejected up front.
pub async fn run_cleanup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CleanupRequest>,
) -> Result<Json<CleanupReport>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let minutes_threshold = payload
        .minutes_threshold
        .unwrap_or(state.cleanup_threshold_minutes);
    validate_minutes_threshold(minutes_threshold, request_id)?;

    info!(
        minutes_threshold,
        user_id = ?payload.user_id,
        dry_run = payload.dry_run,
        "Admin cleanup requested"
    );

    let report = state
        .sweeper
        .cleanup_pending_applications(CleanupOptions {
            minutes_threshold,
            user_id: payload.user_id,
            dry_run: payload.dry_run,
            include_image_cleanup: payload.include_image_cleanup.unwrap_or(true),
        })
        .await;

    Ok(Json(report))
}

/// GET /admin/cleanup/preview
///
/// Lists what a sweep would delete without touching anything.
pub async fn preview_cleanup(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<CleanupPreviewQuery>,
) -> Result<Json<CleanupReport>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let minutes_threshold = query
        .minutes_threshold
        .unwrap_or(state.cleanup_threshold_minutes);
    validate_minutes_threshold(minutes_threshold, request_id)?;

    let report = state
        .sweeper
        .preview_pending_cleanup(query.user_id, minutes_threshold)
        .await;

    Ok(Json(report))
}
