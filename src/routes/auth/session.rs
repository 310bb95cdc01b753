use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};

use crate::{errors::ApiError, models::user::Identity, state::AppState};

/// The verified identity behind an `Authorization: Bearer` access token.
/// Rejects with `Unauthenticated` before the handler runs.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthSession(pub Identity);

impl FromRequestParts<AppState> for AuthSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| {
                    ApiError::Unauthenticated("Missing or malformed bearer token".to_string())
                })?;

        let identity = state.tokens.verify_access(bearer.token())?;
        Ok(AuthSession(identity))
    }
}
