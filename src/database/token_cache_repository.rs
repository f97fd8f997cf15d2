use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use crate::database::error::DatabaseError;
use crate::database::repository::TokenCache;

/// The cached gateway bearer token. `expires_at` is null on rows written by
/// earlier schema versions; those fall back to an age check on `updated_at`.
#[derive(Debug, Clone, FromRow)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Single-row cache table; the row is always id = 1 and replaced in place.
pub struct TokenCacheRepository {
    pool: PgPool,
}

impl TokenCacheRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TokenCache for TokenCacheRepository {
    async fn get(&self) -> Result<Option<CachedToken>, DatabaseError> {
        sqlx::query_as::<_, CachedToken>(
            "SELECT token, expires_at, updated_at FROM payment_token_cache WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    async fn replace(&self, token: &str, expires_at: DateTime<Utc>) -> Result<(), DatabaseError> {
        sqlx::query(
            "INSERT INTO payment_token_cache (id, token, expires_at, updated_at) \
             VALUES (1, $1, $2, NOW()) \
             ON CONFLICT (id) DO UPDATE \
             SET token = EXCLUDED.token, expires_at = EXCLUDED.expires_at, updated_at = NOW()",
        )
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)?;

        Ok(())
    }
}
