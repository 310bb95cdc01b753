use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::debug;

use crate::{
    errors::ApiError,
    responses::JsonResponse,
    routes::auth::session::AuthSession,
    services::aggregation::{compute_recent_activity, compute_stats},
    state::AppState,
};

const NO_STORE: [(header::HeaderName, &str); 2] = [
    (header::CACHE_CONTROL, "no-store, no-cache, must-revalidate"),
    (header::PRAGMA, "no-cache"),
];

pub async fn dashboard_stats(
    State(app_state): State<AppState>,
    AuthSession(identity): AuthSession,
) -> Result<Response, ApiError> {
    let stats = compute_stats(app_state.crm.as_ref(), Utc::now()).await?;
    debug!(user_id = %identity.subject_id, "dashboard stats computed");

    Ok((NO_STORE, JsonResponse::success(stats)).into_response())
}

pub async fn dashboard_activity(
    State(app_state): State<AppState>,
    AuthSession(identity): AuthSession,
) -> Result<Response, ApiError> {
    let items = compute_recent_activity(app_state.crm.as_ref(), &identity).await?;

    Ok((NO_STORE, JsonResponse::success(items)).into_response())
}
