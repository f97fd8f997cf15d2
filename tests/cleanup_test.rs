//! Cleanup sweeper tests against in-process stores.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use oylkka_backend::database::error::DatabaseError;
use oylkka_backend::database::pending_application_repository::PendingApplication;
use oylkka_backend::database::repository::ReservationStore;
use oylkka_backend::services::cleanup::{CleanupOptions, CleanupSweeper};
use oylkka_backend::storage::{ImageStore, StorageError};

fn pending(id: &str, user_id: &str, age_minutes: i64, image_id: Option<&str>) -> PendingApplication {
    PendingApplication {
        id: id.to_string(),
        user_id: user_id.to_string(),
        full_name: "Test Applicant".to_string(),
        father_name: "Father".to_string(),
        mother_name: "Mother".to_string(),
        email: None,
        mobile_number: "01700000000".to_string(),
        birth_date: "2000-01-01".to_string(),
        gender: "male".to_string(),
        education: "SSC".to_string(),
        course_name: "Graphics Design".to_string(),
        session: "2026".to_string(),
        duration: "3 months".to_string(),
        image_id: image_id.map(String::from),
        created_at: Utc::now() - Duration::minutes(age_minutes),
    }
}

#[derive(Default)]
struct InMemoryReservations {
    rows: Mutex<HashMap<String, PendingApplication>>,
}

impl InMemoryReservations {
    fn with(rows: Vec<PendingApplication>) -> Arc<Self> {
        let store = Self::default();
        {
            let mut guard = store.rows.lock().unwrap();
            for row in rows {
                guard.insert(row.id.clone(), row);
            }
        }
        Arc::new(store)
    }

    fn remaining(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.rows.lock().unwrap().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl ReservationStore for InMemoryReservations {
    async fn find_by_id(&self, id: &str) -> Result<Option<PendingApplication>, DatabaseError> {
        Ok(self.rows.lock().unwrap().get(id).cloned())
    }

    async fn find_stale(
        &self,
        cutoff: DateTime<Utc>,
        user_id: Option<&str>,
    ) -> Result<Vec<PendingApplication>, DatabaseError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.created_at < cutoff)
            .filter(|row| user_id.map_or(true, |u| row.user_id == u))
            .cloned()
            .collect())
    }

    async fn find_by_user(&self, user_id: &str) -> Result<Vec<PendingApplication>, DatabaseError> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_by_id(&self, id: &str) -> Result<bool, DatabaseError> {
        Ok(self.rows.lock().unwrap().remove(id).is_some())
    }

    async fn delete_many(&self, ids: &[String]) -> Result<u64, DatabaseError> {
        let mut guard = self.rows.lock().unwrap();
        let mut deleted = 0;
        for id in ids {
            if guard.remove(id).is_some() {
                deleted += 1;
            }
        }
        Ok(deleted)
    }
}

/// Image store that fails deletion for a configured set of IDs.
#[derive(Default)]
struct FlakyImages {
    failing: HashSet<String>,
    deleted: Mutex<Vec<String>>,
}

impl FlakyImages {
    fn failing_on(ids: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            failing: ids.iter().map(|s| s.to_string()).collect(),
            deleted: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl ImageStore for FlakyImages {
    async fn delete_image(&self, image_id: &str) -> Result<(), StorageError> {
        if self.failing.contains(image_id) {
            return Err(StorageError::Service {
                status: 503,
                message: "unavailable".to_string(),
            });
        }
        self.deleted.lock().unwrap().push(image_id.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn threshold_selects_only_old_reservations() {
    let reservations = InMemoryReservations::with(vec![
        pending("old", "user_1", 10, None),
        pending("fresh", "user_2", 1, None),
    ]);
    let sweeper = CleanupSweeper::new(reservations.clone(), FlakyImages::failing_on(&[]));

    let report = sweeper
        .cleanup_pending_applications(CleanupOptions::default())
        .await;

    assert!(report.success);
    assert!(!report.dry_run);
    assert_eq!(report.deleted_count, 1);
    assert_eq!(report.deleted_applications.len(), 1);
    assert_eq!(report.deleted_applications[0].id, "old");
    assert_eq!(reservations.remaining(), vec!["fresh".to_string()]);
}

#[tokio::test]
async fn dry_run_deletes_nothing() {
    let reservations = InMemoryReservations::with(vec![
        pending("old1", "user_1", 10, Some("img1")),
        pending("old2", "user_1", 20, Some("img2")),
    ]);
    let images = FlakyImages::failing_on(&[]);
    let sweeper = CleanupSweeper::new(reservations.clone(), images.clone());

    let report = sweeper
        .cleanup_pending_applications(CleanupOptions {
            dry_run: true,
            ..CleanupOptions::default()
        })
        .await;

    assert!(report.success);
    assert!(report.dry_run);
    assert_eq!(report.deleted_count, 2);
    assert_eq!(report.deleted_images, 0);
    assert_eq!(reservations.remaining().len(), 2);
    assert!(images.deleted.lock().unwrap().is_empty());
}

#[tokio::test]
async fn image_failures_are_counted_not_fatal() {
    let reservations = InMemoryReservations::with(vec![
        pending("old1", "user_1", 10, Some("img1")),
        pending("old2", "user_2", 10, Some("img2")),
    ]);
    let images = FlakyImages::failing_on(&["img2"]);
    let sweeper = CleanupSweeper::new(reservations.clone(), images.clone());

    let report = sweeper
        .cleanup_pending_applications(CleanupOptions::default())
        .await;

    assert!(report.success);
    assert_eq!(report.deleted_count, 2);
    assert_eq!(report.deleted_images, 1);
    assert_eq!(report.failed_images, 1);
    // Rows are deleted even when their image cleanup fails.
    assert!(reservations.remaining().is_empty());
}

#[tokio::test]
async fn user_scoped_sweep_ignores_age() {
    let reservations = InMemoryReservations::with(vec![
        pending("mine-fresh", "user_1", 0, None),
        pending("mine-old", "user_1", 30, None),
        pending("theirs", "user_2", 30, None),
    ]);
    let sweeper = CleanupSweeper::new(reservations.clone(), FlakyImages::failing_on(&[]));

    let report = sweeper.cleanup_user_pending_applications("user_1").await;

    assert!(report.success);
    assert_eq!(report.deleted_count, 2);
    assert_eq!(reservations.remaining(), vec!["theirs".to_string()]);
}

#[tokio::test]
async fn user_filter_applies_to_threshold_sweep() {
    let reservations = InMemoryReservations::with(vec![
        pending("mine-old", "user_1", 30, None),
        pending("theirs-old", "user_2", 30, None),
    ]);
    let sweeper = CleanupSweeper::new(reservations.clone(), FlakyImages::failing_on(&[]));

    let report = sweeper
        .cleanup_pending_applications(CleanupOptions {
            user_id: Some("user_1".to_string()),
            ..CleanupOptions::default()
        })
        .await;

    assert_eq!(report.deleted_count, 1);
    assert_eq!(reservations.remaining(), vec!["theirs-old".to_string()]);
}

#[tokio::test]
async fn out_of_range_threshold_yields_failed_report() {
    let reservations = InMemoryReservations::with(vec![pending("old", "user_1", 10, None)]);
    let sweeper = CleanupSweeper::new(reservations.clone(), FlakyImages::failing_on(&[]));

    // A threshold this large overflows the cutoff arithmetic; the sweep must
    // come back as a failed report, not take down the caller's task.
    let report = sweeper
        .cleanup_pending_applications(CleanupOptions {
            minutes_threshold: i64::MAX,
            ..CleanupOptions::default()
        })
        .await;

    assert!(!report.success);
    assert_eq!(report.deleted_count, 0);
    assert!(report.error.is_some());
    assert_eq!(reservations.remaining(), vec!["old".to_string()]);
}

#[tokio::test]
async fn empty_sweep_yields_empty_report() {
    let reservations = InMemoryReservations::with(vec![]);
    let sweeper = CleanupSweeper::new(reservations, FlakyImages::failing_on(&[]));

    let report = sweeper
        .cleanup_pending_applications(CleanupOptions::default())
        .await;

    assert!(report.success);
    assert_eq!(report.deleted_count, 0);
    assert!(report.deleted_applications.is_empty());
    assert!(report.error.is_none());
}

#[tokio::test]
async fn preview_reports_without_deleting() {
    let reservations = InMemoryReservations::with(vec![pending("old", "user_1", 10, Some("img1"))]);
    let images = FlakyImages::failing_on(&[]);
    let sweeper = CleanupSweeper::new(reservations.clone(), images.clone());

    let report = sweeper.preview_pending_cleanup(None, 3).await;

    assert!(report.dry_run);
    assert_eq!(report.deleted_count, 1);
    assert_eq!(reservations.remaining(), vec!["old".to_string()]);
    assert!(images.deleted.lock().unwrap().is_empty());
}
