use axum::{
    extract::{rejection::JsonRejection, State},
    response::Response,
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::session::AuthSession;
use crate::{
    errors::ApiError,
    models::user::PublicUser,
    responses::JsonResponse,
    state::AppState,
    utils::password::{verify_password, verify_unknown_account},
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginPayload {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: PublicUser,
}

pub async fn handle_login(
    State(app_state): State<AppState>,
    payload: Result<Json<LoginPayload>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload?;
    let email = payload.email.trim();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::ValidationFailed(
            "Email and password are required".to_string(),
        ));
    }

    let Some(user) = app_state.db.find_user_by_email(email).await? else {
        verify_unknown_account(&payload.password);
        info!("login attempt for unknown account");
        return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    };

    let matches = verify_password(&payload.password, &user.password_hash).map_err(|err| {
        error!(user_id = %user.id, ?err, "stored password hash is unreadable");
        ApiError::Internal("password verification failed".to_string())
    })?;

    if !matches || !user.is_active {
        warn!(user_id = %user.id, active = user.is_active, "login rejected");
        return Err(ApiError::Unauthenticated(INVALID_CREDENTIALS.to_string()));
    }

    let pair = app_state.tokens.issue(&user.identity()).await?;
    info!(user_id = %user.id, role = %user.role, "user logged in");

    Ok(JsonResponse::success(LoginResponse {
        access_token: pair.access_token,
        refresh_token: pair.refresh_token,
        token_type: "Bearer",
        expires_in: app_state.tokens.access_ttl().num_seconds(),
        user: PublicUser::from(&user),
    }))
}

/// The caller's identity exactly as carried by the access token.
pub async fn handle_me(AuthSession(identity): AuthSession) -> Response {
    JsonResponse::success(identity)
}
