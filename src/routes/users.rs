use axum::{
    extract::{rejection::PathRejection, Path, State},
    response::Response,
};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    responses::JsonResponse,
    routes::auth::session::AuthSession,
    services::authorization::{decide, Action, Resource},
    state::AppState,
};

/// Admin-only. Deleting the caller's own account is always refused.
pub async fn delete_user(
    State(app_state): State<AppState>,
    AuthSession(identity): AuthSession,
    user_id: Result<Path<Uuid>, PathRejection>,
) -> Result<Response, ApiError> {
    let Path(user_id) = user_id?;

    let decision = decide(&identity, Action::Delete, Resource::user_account(user_id));
    if !decision.allow {
        warn!(
            actor = %identity.subject_id,
            target = %user_id,
            reason = ?decision.reason,
            "user deletion denied"
        );
        return Err(ApiError::Forbidden(decision.reason.message().to_string()));
    }

    if !app_state.db.delete_user(user_id).await? {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    info!(actor = %identity.subject_id, target = %user_id, "user deleted");
    Ok(JsonResponse::message("User deleted"))
}
