use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::services::refresh_store::{RefreshTokenStore, StoreError};

/// Shared store for deployments running more than one instance. Outstanding
/// refresh tokens survive restarts.
pub struct PostgresRefreshTokenStore {
    pub pool: PgPool,
}

#[async_trait]
impl RefreshTokenStore for PostgresRefreshTokenStore {
    async fn insert(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (fingerprint, expires_at)
            VALUES ($1, $2)
            ON CONFLICT (fingerprint) DO UPDATE SET expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(fingerprint)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn remove(&self, fingerprint: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM refresh_tokens WHERE fingerprint = $1")
            .bind(fingerprint)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn contains(&self, fingerprint: &str) -> Result<bool, StoreError> {
        let exists = sqlx::query_scalar::<_, i32>(
            "SELECT 1 FROM refresh_tokens WHERE fingerprint = $1",
        )
        .bind(fingerprint)
        .fetch_optional(&self.pool)
        .await?
        .is_some();

        Ok(exists)
    }
}
