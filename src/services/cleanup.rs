//! Cleanup sweeper for abandoned reservations
//!
//! Reservations that never reach the payment callback (payer closed the
//! tab, gateway never redirected) would otherwise live forever. The sweeper
//! deletes reservations older than a threshold, with best-effort deletion
//! of their stored images. It never propagates errors: every invocation
//! resolves to a report, and callers decide whether to alert or retry.

use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::database::error::DatabaseError;
use crate::database::pending_application_repository::PendingApplication;
use crate::database::repository::ReservationStore;
use crate::storage::ImageStore;

/// Sweep parameters.
#[derive(Debug, Clone)]
pub struct CleanupOptions {
    /// Reservations older than this many minutes are candidates.
    pub minutes_threshold: i64,
    /// Restrict the sweep to one user's reservations.
    pub user_id: Option<String>,
    /// Report candidates without deleting anything.
    pub dry_run: bool,
    /// Attempt image deletion for candidates that have one.
    pub include_image_cleanup: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            minutes_threshold: 3,
            user_id: None,
            dry_run: false,
            include_image_cleanup: true,
        }
    }
}

/// Summary of one candidate, echoed back in the report.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupCandidate {
    pub id: String,
    pub user_id: String,
    pub image_id: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl From<&PendingApplication> for CleanupCandidate {
    fn from(pending: &PendingApplication) -> Self {
        Self {
            id: pending.id.clone(),
            user_id: pending.user_id.clone(),
            image_id: pending.image_id.clone(),
            created_at: pending.created_at,
        }
    }
}

/// Outcome of a sweep. `success` is false only when the sweep itself blew
/// up (e.g. database unavailable); individual image-delete failures are
/// counted, not escalated.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    pub success: bool,
    pub deleted_count: u64,
    pub deleted_images: u64,
    pub failed_images: u64,
    pub deleted_applications: Vec<CleanupCandidate>,
    pub dry_run: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CleanupReport {
    fn empty(dry_run: bool) -> Self {
        Self {
            success: true,
            deleted_count: 0,
            deleted_images: 0,
            failed_images: 0,
            deleted_applications: Vec::new(),
            dry_run,
            error: None,
        }
    }

    fn failed(error: String) -> Self {
        Self {
            success: false,
            deleted_count: 0,
            deleted_images: 0,
            failed_images: 0,
            deleted_applications: Vec::new(),
            dry_run: false,
            error: Some(error),
        }
    }
}

/// Reclaims reservations abandoned before any callback.
pub struct CleanupSweeper {
    reservations: Arc<dyn ReservationStore>,
    images: Arc<dyn ImageStore>,
}

impl CleanupSweeper {
    pub fn new(reservations: Arc<dyn ReservationStore>, images: Arc<dyn ImageStore>) -> Self {
        Self {
            reservations,
            images,
        }
    }

    /// Sweep reservations older than the threshold.
    pub async fn cleanup_pending_applications(&self, options: CleanupOptions) -> CleanupReport {
        // Absurd thresholds overflow the duration math; report instead of
        // aborting, the never-throws contract covers bad input too.
        let cutoff = match Duration::try_minutes(options.minutes_threshold)
            .and_then(|age| Utc::now().checked_sub_signed(age))
        {
            Some(cutoff) => cutoff,
            None => {
                warn!(
                    minutes_threshold = options.minutes_threshold,
                    "Cleanup threshold out of range"
                );
                return CleanupReport::failed(format!(
                    "minutes_threshold out of range: {}",
                    options.minutes_threshold
                ));
            }
        };

        let candidates = match self
            .reservations
            .find_stale(cutoff, options.user_id.as_deref())
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "Cleanup sweep failed to list candidates");
                return CleanupReport::failed(e.to_string());
            }
        };

        match self
            .sweep(candidates, options.dry_run, options.include_image_cleanup)
            .await
        {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, "Cleanup sweep failed");
                CleanupReport::failed(e.to_string())
            }
        }
    }

    /// Remove all of one user's reservations regardless of age (used before
    /// accepting a fresh submission).
    pub async fn cleanup_user_pending_applications(&self, user_id: &str) -> CleanupReport {
        let candidates = match self.reservations.find_by_user(user_id).await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User cleanup failed to list reservations");
                return CleanupReport::failed(e.to_string());
            }
        };

        match self.sweep(candidates, false, true).await {
            Ok(report) => report,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "User cleanup failed");
                CleanupReport::failed(e.to_string())
            }
        }
    }

    /// Report what a sweep would delete without touching anything.
    pub async fn preview_pending_cleanup(
        &self,
        user_id: Option<String>,
        minutes_threshold: i64,
    ) -> CleanupReport {
        self.cleanup_pending_applications(CleanupOptions {
            minutes_threshold,
            user_id,
            dry_run: true,
            include_image_cleanup: false,
        })
        .await
    }

    async fn sweep(
        &self,
        candidates: Vec<PendingApplication>,
        dry_run: bool,
        include_image_cleanup: bool,
    ) -> Result<CleanupReport, DatabaseError> {
        if candidates.is_empty() {
            return Ok(CleanupReport::empty(dry_run));
        }

        let summaries: Vec<CleanupCandidate> = candidates.iter().map(Into::into).collect();

        if dry_run {
            info!(
                candidates = summaries.len(),
                "Cleanup dry run, nothing deleted"
            );
            return Ok(CleanupReport {
                success: true,
                deleted_count: summaries.len() as u64,
                deleted_images: 0,
                failed_images: 0,
                deleted_applications: summaries,
                dry_run: true,
                error: None,
            });
        }

        let mut deleted_images = 0u64;
        let mut failed_images = 0u64;

        if include_image_cleanup {
            for candidate in &candidates {
                let Some(image_id) = &candidate.image_id else {
                    continue;
                };
                match self.images.delete_image(image_id).await {
                    Ok(()) => deleted_images += 1,
                    Err(e) => {
                        warn!(image_id = %image_id, error = %e, "Stale reservation image delete failed");
                        failed_images += 1;
                    }
                }
            }
        }

        let ids: Vec<String> = candidates.iter().map(|c| c.id.clone()).collect();
        let deleted_count = self.reservations.delete_many(&ids).await?;

        info!(
            deleted_count,
            deleted_images, failed_images, "Cleanup sweep finished"
        );

        Ok(CleanupReport {
            success: true,
            deleted_count,
            deleted_images,
            failed_images,
            deleted_applications: summaries,
            dry_run: false,
            error: None,
        })
    }
}
