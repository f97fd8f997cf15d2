//! Domain-facing store traits
//!
//! The services depend on these traits rather than on concrete sqlx
//! repositories so the workflow logic can be exercised with in-process
//! implementations in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::database::application_repository::{Application, PaymentRecord};
use crate::database::error::DatabaseError;
use crate::database::pending_application_repository::PendingApplication;
use crate::database::token_cache_repository::CachedToken;

/// Access to pending-application reservations.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<PendingApplication>, DatabaseError>;

    /// Reservations created before `cutoff`, optionally scoped to one user.
    async fn find_stale(
        &self,
        cutoff: DateTime<Utc>,
        user_id: Option<&str>,
    ) -> Result<Vec<PendingApplication>, DatabaseError>;

    /// All reservations for one user, regardless of age.
    async fn find_by_user(&self, user_id: &str) -> Result<Vec<PendingApplication>, DatabaseError>;

    /// Returns false when the row was already gone.
    async fn delete_by_id(&self, id: &str) -> Result<bool, DatabaseError>;

    /// Bulk delete; returns the number of rows removed.
    async fn delete_many(&self, ids: &[String]) -> Result<u64, DatabaseError>;
}

/// The permanent application ledger. `promote` is the only way an
/// application record comes into existence.
#[async_trait]
pub trait ApplicationLedger: Send + Sync {
    /// Atomically claim the reservation and create the permanent record
    /// with the next roll number. Fails with a NotFound error when the
    /// reservation no longer exists (already promoted, discarded or swept).
    async fn promote(
        &self,
        pending_id: &str,
        payment: PaymentRecord,
    ) -> Result<Application, DatabaseError>;
}

/// Single-row bearer-token cache for the payment gateway.
#[async_trait]
pub trait TokenCache: Send + Sync {
    async fn get(&self) -> Result<Option<CachedToken>, DatabaseError>;

    /// Replace the cached row (update in place, insert when absent).
    async fn replace(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), DatabaseError>;
}
