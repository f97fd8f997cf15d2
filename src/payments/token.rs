//! Gateway token lifecycle
//!
//! The bearer token lives in a single database row shared by every payment
//! operation. A fetch either returns the cached token or refreshes it behind
//! a single-flight lock, writing the new token back before returning. A
//! failed refresh yields `None` and the caller's request goes out without
//! credentials, surfacing the provider's 401 instead of a local error.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::database::repository::TokenCache;
use crate::database::token_cache_repository::CachedToken;
use crate::payments::error::GatewayResult;
use crate::payments::types::TokenGrant;

/// Tokens are treated as expired this long before their stored expiry so an
/// in-flight request never straddles the boundary.
const EXPIRY_SKEW_MINUTES: i64 = 5;

/// Age limit for rows that predate the expires_at column.
const LEGACY_TTL_MINUTES: i64 = 60;

/// TTL assumed when the provider omits expires_in.
const DEFAULT_TTL_SECS: i64 = 3600;

/// Performs the actual auth call against the provider.
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    async fn refresh(&self) -> GatewayResult<TokenGrant>;
}

/// Cached-token manager with single-flight refresh.
pub struct TokenStore {
    cache: Arc<dyn TokenCache>,
    refresh_lock: Mutex<()>,
}

impl TokenStore {
    pub fn new(cache: Arc<dyn TokenCache>) -> Self {
        Self {
            cache,
            refresh_lock: Mutex::new(()),
        }
    }

    /// Return a valid bearer token, refreshing the cache when needed.
    /// Returns `None` when no token can be obtained.
    pub async fn bearer_token(&self, refresher: &dyn TokenRefresher) -> Option<String> {
        let now = Utc::now();

        match self.cache.get().await {
            Ok(Some(row)) if !is_expired(&row, now) => {
                debug!("Using cached gateway token");
                return Some(row.token);
            }
            Ok(_) => {}
            Err(e) => {
                warn!(error = %e, "Token cache read failed, refreshing");
            }
        }

        let _guard = self.refresh_lock.lock().await;

        // Another caller may have refreshed while we waited on the lock.
        if let Ok(Some(row)) = self.cache.get().await {
            if !is_expired(&row, Utc::now()) {
                return Some(row.token);
            }
        }

        match refresher.refresh().await {
            Ok(grant) => {
                let expires_at = compute_expiry(Utc::now(), grant.expires_in);
                if let Err(e) = self.cache.replace(&grant.token, expires_at).await {
                    warn!(error = %e, "Failed to persist refreshed gateway token");
                }
                info!(expires_at = %expires_at, "Gateway token refreshed");
                Some(grant.token)
            }
            Err(e) => {
                warn!(error = %e, "Gateway token refresh failed");
                None
            }
        }
    }
}

/// A token with an explicit expiry is stale once we are within the skew
/// window of it; legacy rows without one are stale an hour after their
/// last update.
pub fn is_expired(row: &CachedToken, now: DateTime<Utc>) -> bool {
    match row.expires_at {
        Some(expires_at) => now > expires_at - Duration::minutes(EXPIRY_SKEW_MINUTES),
        None => now > row.updated_at + Duration::minutes(LEGACY_TTL_MINUTES),
    }
}

/// New expiry for a refreshed token.
pub fn compute_expiry(now: DateTime<Utc>, expires_in: Option<i64>) -> DateTime<Utc> {
    now + Duration::seconds(expires_in.unwrap_or(DEFAULT_TTL_SECS))
}
