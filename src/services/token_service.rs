use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::AuthSettings;
use crate::models::user::Identity;
use crate::routes::auth::claims::{Claims, TokenUse};
use crate::services::refresh_store::{fingerprint, RefreshTokenStore, StoreError};
use crate::utils::jwt::{create_jwt, decode_jwt, JwtKeys, JwtSecretError};

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid or expired token")]
    InvalidToken,
    #[error("failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Issues and verifies access/refresh pairs.
///
/// Access tokens are stateless. A refresh token is only honoured while its
/// fingerprint is present in the store, so the store acts as an allow-list of
/// tokens issued by this deployment.
pub struct TokenService {
    access_keys: JwtKeys,
    refresh_keys: JwtKeys,
    issuer: String,
    audience: String,
    access_ttl: Duration,
    refresh_ttl: Duration,
    store: Arc<dyn RefreshTokenStore>,
}

impl std::fmt::Debug for TokenService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenService")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish_non_exhaustive()
    }
}

impl TokenService {
    pub fn new(
        settings: &AuthSettings,
        store: Arc<dyn RefreshTokenStore>,
    ) -> Result<Self, JwtSecretError> {
        if settings.access_secret == settings.refresh_secret {
            return Err(JwtSecretError::SharedSecret);
        }

        Ok(Self {
            access_keys: JwtKeys::from_secret("JWT_ACCESS_SECRET", &settings.access_secret)?,
            refresh_keys: JwtKeys::from_secret("JWT_REFRESH_SECRET", &settings.refresh_secret)?,
            issuer: settings.issuer.clone(),
            audience: settings.audience.clone(),
            access_ttl: Duration::minutes(settings.access_ttl_minutes),
            refresh_ttl: Duration::days(settings.refresh_ttl_days),
            store,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub async fn issue(&self, identity: &Identity) -> Result<TokenPair, TokenError> {
        let now = Utc::now();
        let access_token = self.sign(identity, TokenUse::Access, now, now + self.access_ttl)?;

        let refresh_expires_at = now + self.refresh_ttl;
        let refresh_token =
            self.sign(identity, TokenUse::Refresh, now, refresh_expires_at)?;
        self.store
            .insert(&fingerprint(&refresh_token), refresh_expires_at)
            .await?;

        debug!(user_id = %identity.subject_id, "issued token pair");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<Identity, TokenError> {
        let claims = self.decode(token, TokenUse::Access)?;
        Ok(claims.identity())
    }

    pub async fn verify_refresh(&self, token: &str) -> Result<Identity, TokenError> {
        let claims = self.decode(token, TokenUse::Refresh)?;

        if !self.store.contains(&fingerprint(token)).await? {
            warn!(user_id = %claims.sub, "refresh token not in active set");
            return Err(TokenError::InvalidToken);
        }

        Ok(claims.identity())
    }

    /// Mints a fresh access token. The refresh token stays active.
    pub async fn rotate(&self, refresh_token: &str) -> Result<String, TokenError> {
        let identity = self.verify_refresh(refresh_token).await?;
        let now = Utc::now();
        self.sign(&identity, TokenUse::Access, now, now + self.access_ttl)
    }

    /// Idempotent; unknown or malformed tokens are ignored.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), TokenError> {
        self.store.remove(&fingerprint(refresh_token)).await?;
        Ok(())
    }

    fn keys_for(&self, token_use: TokenUse) -> &JwtKeys {
        match token_use {
            TokenUse::Access => &self.access_keys,
            TokenUse::Refresh => &self.refresh_keys,
        }
    }

    fn sign(
        &self,
        identity: &Identity,
        token_use: TokenUse,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = Claims::new(
            identity,
            token_use,
            issued_at.timestamp(),
            expires_at.timestamp(),
        );
        Ok(create_jwt(
            claims,
            self.keys_for(token_use),
            &self.issuer,
            &self.audience,
        )?)
    }

    fn decode(&self, token: &str, expected: TokenUse) -> Result<Claims, TokenError> {
        let claims = decode_jwt(token, self.keys_for(expected), &self.issuer, &self.audience)
            .map_err(|err| {
                debug!(?err, token_use = ?expected, "token rejected");
                TokenError::InvalidToken
            })?;

        if claims.token_use != expected {
            return Err(TokenError::InvalidToken);
        }

        Ok(claims)
    }
}

#[cfg(test)]
impl TokenService {
    pub fn for_tests(store: Arc<dyn RefreshTokenStore>) -> Self {
        Self::new(&AuthSettings::for_tests(), store).expect("test secrets are valid")
    }

    /// Signs an access token with arbitrary timestamps, e.g. already expired.
    pub fn sign_access_at(
        &self,
        identity: &Identity,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> String {
        self.sign(identity, TokenUse::Access, issued_at, expires_at)
            .expect("signing should succeed")
    }
}
