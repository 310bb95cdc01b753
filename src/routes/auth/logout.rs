use axum::{body::Bytes, extract::State, response::Response};
use serde::Deserialize;
use tracing::{info, warn};

use crate::{responses::JsonResponse, state::AppState};

#[derive(Debug, Default, Deserialize)]
pub struct LogoutPayload {
    pub refresh_token: Option<String>,
}

/// Always succeeds. A supplied refresh token is dropped from the active set;
/// a missing, unknown or unparsable one is ignored.
pub async fn handle_logout(State(app_state): State<AppState>, body: Bytes) -> Response {
    let payload: LogoutPayload = serde_json::from_slice(&body).unwrap_or_default();

    if let Some(token) = payload
        .refresh_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        match app_state.tokens.revoke(token).await {
            Ok(()) => info!("refresh token revoked"),
            Err(err) => warn!(?err, "failed to revoke refresh token during logout"),
        }
    }

    JsonResponse::message("Logged out")
}
