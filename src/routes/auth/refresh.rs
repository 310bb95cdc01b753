use axum::{
    extract::{rejection::JsonRejection, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{errors::ApiError, responses::JsonResponse, state::AppState};

#[derive(Debug, Deserialize)]
pub struct RefreshPayload {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
}

/// Exchanges an active refresh token for a new access token. The refresh
/// token itself is neither replaced nor consumed.
///
/// The account must still exist and be active; otherwise the refresh token is
/// revoked so it cannot keep minting access tokens.
pub async fn handle_refresh(
    State(app_state): State<AppState>,
    payload: Result<Json<RefreshPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let token = payload.refresh_token.trim();
    if token.is_empty() {
        return Err(ApiError::ValidationFailed(
            "refresh_token is required".to_string(),
        ));
    }

    let identity = app_state.tokens.verify_refresh(token).await?;
    match app_state.db.find_user_by_id(identity.subject_id).await? {
        Some(user) if user.is_active => {}
        _ => {
            warn!(user_id = %identity.subject_id, "refresh for missing or inactive account");
            if let Err(err) = app_state.tokens.revoke(token).await {
                warn!(?err, "failed to revoke refresh token of inactive account");
            }
            return Err(ApiError::Unauthenticated(
                "Invalid or expired token".to_string(),
            ));
        }
    }

    let access_token = app_state.tokens.rotate(token).await?;
    debug!(user_id = %identity.subject_id, "access token refreshed");

    Ok(JsonResponse::success(RefreshResponse {
        access_token,
        token_type: "Bearer",
        expires_in: app_state.tokens.access_ttl().num_seconds(),
    }))
}
