use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("refresh token store query failed: {0}")]
    Backend(#[from] sqlx::Error),
}

/// Active refresh tokens, keyed by [`fingerprint`].
///
/// Membership is what makes a refresh token usable: tokens are inserted when
/// issued and removed on logout. Expiry is left to signature verification, so
/// entries are never dropped just because they have expired.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn insert(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError>;
    /// Removing an absent key is not an error.
    async fn remove(&self, fingerprint: &str) -> Result<(), StoreError>;
    async fn contains(&self, fingerprint: &str) -> Result<bool, StoreError>;
}

/// SHA-256 hex digest of the raw token; raw refresh tokens are never stored.
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Process-local store. Every outstanding refresh token becomes unusable when
/// the process restarts.
#[derive(Debug, Default)]
pub struct InMemoryRefreshTokenStore {
    tokens: DashMap<String, DateTime<Utc>>,
}

impl InMemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenStore {
    async fn insert(&self, fingerprint: &str, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        self.tokens.insert(fingerprint.to_owned(), expires_at);
        Ok(())
    }

    async fn remove(&self, fingerprint: &str) -> Result<(), StoreError> {
        self.tokens.remove(fingerprint);
        Ok(())
    }

    async fn contains(&self, fingerprint: &str) -> Result<bool, StoreError> {
        Ok(self.tokens.contains_key(fingerprint))
    }
}
